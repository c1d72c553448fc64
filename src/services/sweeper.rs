use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;

/// 分批执行过期清理，直到某一批删除的行数少于批量大小
///
/// `batch_size` 为0表示一次性删除全部；非空批次之间暂停 `pause`，缩短单次锁表时间。
pub async fn sweep_in_batches<F, Fut>(
    batch_size: u64,
    pause: Duration,
    mut delete_batch: F,
) -> Result<u64, StoreError>
where
    F: FnMut(Option<u64>) -> Fut,
    Fut: Future<Output = Result<u64, StoreError>>,
{
    let limit = (batch_size > 0).then_some(batch_size);
    let mut total = 0;

    loop {
        let deleted = delete_batch(limit).await?;
        total += deleted;

        match limit {
            Some(limit) if deleted >= limit => {
                tracing::debug!("Deleted batch of {} rows, continuing", deleted);
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
            }
            _ => break,
        }
    }

    Ok(total)
}
