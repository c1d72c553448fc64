use chrono::{DateTime, Utc};

use crate::database::models::ExternalSession;
use crate::database::store::ExternalSessionStore;
use crate::error::StoreError;

/// 外部会话映射服务
///
/// 单点登录提供方发来注销通知时只带外部会话ID，需要借助映射找到本地会话。
#[derive(Clone)]
pub struct ExternalSessionService<S> {
    store: S,
}

impl<S: ExternalSessionStore> ExternalSessionService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// 建立映射，先清除本地会话已有的映射
    pub async fn add_session_mapping(
        &self,
        local_session_id: &str,
        external_session_id: &str,
    ) -> Result<ExternalSession, StoreError> {
        self.destroy_session(local_session_id).await?;
        self.store
            .insert(local_session_id, external_session_id)
            .await
    }

    pub async fn get_all_by_external_session_id(
        &self,
        external_session_id: &str,
    ) -> Result<Vec<ExternalSession>, StoreError> {
        self.store
            .find_by_external_session_id(external_session_id)
            .await
    }

    pub async fn destroy_session(&self, local_session_id: &str) -> Result<(), StoreError> {
        self.store.delete_by_session_id(local_session_id).await
    }

    /// 删除创建时间早于 `cutoff` 的映射
    pub async fn delete_expired(
        &self,
        cutoff: DateTime<Utc>,
        limit: Option<u64>,
    ) -> Result<u64, StoreError> {
        let deleted = self.store.delete_created_before(cutoff, limit).await?;
        if deleted > 0 {
            tracing::info!("Deleted {} expired external session mappings", deleted);
        }
        Ok(deleted)
    }
}
