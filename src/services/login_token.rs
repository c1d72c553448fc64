use chrono::{DateTime, Utc};

use crate::database::models::{LoginToken, NewLoginToken};
use crate::database::store::TokenStore;
use crate::error::{LoginTokenError, StoreError};
use crate::utils::{digests_equal, hash_token};

/// 登录令牌服务：校验、签发与清理
///
/// 服务本身不保存状态，也不加锁；并发安全依赖存储层的事务隔离。
#[derive(Clone)]
pub struct LoginTokenService<S> {
    store: S,
}

impl<S: TokenStore> LoginTokenService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 校验系列与令牌
    ///
    /// - 摘要匹配且未过期：返回该令牌
    /// - 摘要匹配但已过期：删除该令牌并返回 `None`
    /// - 系列存在但没有任何摘要匹配：返回 [`LoginTokenError::TokenMismatch`]
    /// - 系列不存在：返回 `None`
    pub async fn match_token(
        &self,
        series: &str,
        token: &str,
    ) -> Result<Option<LoginToken>, LoginTokenError> {
        self.match_token_at(series, token, Utc::now()).await
    }

    pub async fn match_token_at(
        &self,
        series: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<LoginToken>, LoginTokenError> {
        let rows = self.store.find_by_series(series).await?;
        let presented = hash_token(token);

        for row in &rows {
            if !digests_equal(&row.token_hash, &presented) {
                continue;
            }
            if row.is_expired_at(now) {
                tracing::debug!("Login token {} expired, removing", row.id);
                self.store.delete_by_id(row.id).await?;
                return Ok(None);
            }
            return Ok(Some(row.clone()));
        }

        match rows.first() {
            Some(row) => {
                tracing::warn!(
                    "Login token mismatch in known series for user {}",
                    row.user_id
                );
                Err(LoginTokenError::TokenMismatch {
                    user_id: row.user_id,
                })
            }
            None => {
                tracing::debug!("No login tokens for presented series");
                Ok(None)
            }
        }
    }

    /// 保存新令牌（只保存摘要），不会删除同系列的旧令牌
    #[allow(clippy::too_many_arguments)]
    pub async fn create_and_persist_token(
        &self,
        user_id: i64,
        token: &str,
        series: &str,
        browser: &str,
        platform: &str,
        expires: i64,
        session_id: &str,
    ) -> Result<LoginToken, StoreError> {
        let row = NewLoginToken {
            user_id,
            token_hash: hash_token(token),
            series: series.to_string(),
            last_login: Utc::now(),
            browser: browser.to_string(),
            platform: platform.to_string(),
            expires,
            last_session_id: session_id.to_string(),
        };

        self.store.insert(row).await
    }

    /// 删除系列中的令牌，`keep_id` 指定的令牌保留
    pub async fn delete_by_series(
        &self,
        series: &str,
        keep_id: Option<i64>,
    ) -> Result<(), StoreError> {
        self.store.delete_by_series_except(series, keep_id).await
    }

    /// 删除 `last_login` 早于 `cutoff` 的令牌
    pub async fn delete_expired(
        &self,
        cutoff: DateTime<Utc>,
        limit: Option<u64>,
    ) -> Result<u64, StoreError> {
        let deleted = self
            .store
            .delete_where_last_login_before(cutoff, limit)
            .await?;
        if deleted > 0 {
            tracing::info!("Deleted {} expired login tokens", deleted);
        }
        Ok(deleted)
    }

    pub async fn get_by_user(&self, user_id: i64) -> Result<Vec<LoginToken>, StoreError> {
        self.store.find_by_user(user_id).await
    }

    pub async fn delete_by_user(&self, user_id: i64) -> Result<(), StoreError> {
        self.store.delete_by_user(user_id).await
    }

    pub async fn delete_by_id_for_user(&self, user_id: i64, id: i64) -> Result<(), StoreError> {
        self.store.delete_by_id_for_user(user_id, id).await
    }
}
