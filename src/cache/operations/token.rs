use std::sync::Arc;

use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client as RedisClient};

use crate::cache::keys::{
    LOGIN_TOKEN_ID_KEY, LOGIN_TOKEN_LAST_LOGIN_KEY, login_token_key, login_token_series_key,
    login_token_user_key,
};
use crate::database::models::{LoginToken, NewLoginToken};
use crate::database::store::{TokenStore, effective_limit};
use crate::error::StoreError;

/// 基于 Redis 的登录令牌存储
///
/// 每条令牌以 JSON 保存在 `login_token:{id}`，另维护三个索引：
/// 系列集合、用户集合，以及按 `last_login` 毫秒时间戳排序的有序集合（供过期清理使用）。
/// 写入与删除都放在 MULTI 事务中执行，索引与记录保持一致。
#[derive(Clone)]
pub struct RedisLoginTokenStore {
    redis: Arc<RedisClient>,
}

impl RedisLoginTokenStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        Ok(self.redis.get_multiplexed_async_connection().await?)
    }

    /// 批量读取令牌，跳过已不存在的记录
    async fn load(
        conn: &mut MultiplexedConnection,
        ids: &[i64],
    ) -> Result<Vec<LoginToken>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| login_token_key(*id)).collect();
        let values: Vec<Option<String>> = redis::cmd("MGET").arg(&keys).query_async(conn).await?;

        let mut tokens = Vec::with_capacity(values.len());
        for json in values.into_iter().flatten() {
            tokens.push(serde_json::from_str::<LoginToken>(&json)?);
        }
        Ok(tokens)
    }

    /// 删除令牌及其索引，返回实际删除的记录数
    async fn remove(
        conn: &mut MultiplexedConnection,
        tokens: &[LoginToken],
    ) -> Result<u64, StoreError> {
        if tokens.is_empty() {
            return Ok(0);
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for token in tokens {
            pipe.del(login_token_key(token.id))
                .srem(login_token_series_key(&token.series), token.id)
                .ignore()
                .srem(login_token_user_key(token.user_id), token.id)
                .ignore()
                .zrem(LOGIN_TOKEN_LAST_LOGIN_KEY, token.id)
                .ignore();
        }

        let deleted: Vec<u64> = pipe.query_async(conn).await?;
        Ok(deleted.into_iter().sum())
    }

    async fn series_tokens(
        conn: &mut MultiplexedConnection,
        series: &str,
    ) -> Result<Vec<LoginToken>, StoreError> {
        let ids: Vec<i64> = conn.smembers(login_token_series_key(series)).await?;
        Self::load(conn, &ids).await
    }

    async fn user_tokens(
        conn: &mut MultiplexedConnection,
        user_id: i64,
    ) -> Result<Vec<LoginToken>, StoreError> {
        let ids: Vec<i64> = conn.smembers(login_token_user_key(user_id)).await?;
        Self::load(conn, &ids).await
    }
}

impl TokenStore for RedisLoginTokenStore {
    async fn find_by_series(&self, series: &str) -> Result<Vec<LoginToken>, StoreError> {
        let mut conn = self.connection().await?;
        let mut tokens = Self::series_tokens(&mut conn, series).await?;
        tokens.sort_by_key(|t| t.id);
        Ok(tokens)
    }

    async fn insert(&self, token: NewLoginToken) -> Result<LoginToken, StoreError> {
        let mut conn = self.connection().await?;

        let id: i64 = conn.incr(LOGIN_TOKEN_ID_KEY, 1).await?;
        let row = token.with_id(id);
        let json = serde_json::to_string(&row)?;

        let _: () = redis::pipe()
            .atomic()
            .set(login_token_key(id), json)
            .ignore()
            .sadd(login_token_series_key(&row.series), id)
            .ignore()
            .sadd(login_token_user_key(row.user_id), id)
            .ignore()
            .zadd(LOGIN_TOKEN_LAST_LOGIN_KEY, id, row.last_login.timestamp_millis())
            .ignore()
            .query_async(&mut conn)
            .await?;

        tracing::debug!("Cached login token {} for user {}", id, row.user_id);
        Ok(row)
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let tokens = Self::load(&mut conn, &[id]).await?;
        Self::remove(&mut conn, &tokens).await?;
        Ok(())
    }

    async fn delete_by_series_except(
        &self,
        series: &str,
        keep_id: Option<i64>,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let tokens: Vec<LoginToken> = Self::series_tokens(&mut conn, series)
            .await?
            .into_iter()
            .filter(|t| Some(t.id) != keep_id)
            .collect();
        Self::remove(&mut conn, &tokens).await?;
        Ok(())
    }

    async fn delete_where_last_login_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: Option<u64>,
    ) -> Result<u64, StoreError> {
        let mut conn = self.connection().await?;

        // 整批都是孤立ID时清理后重新取，避免返回0让分批清理提前结束
        loop {
            // "(" 表示不包含边界值
            let mut cmd = redis::cmd("ZRANGEBYSCORE");
            cmd.arg(LOGIN_TOKEN_LAST_LOGIN_KEY)
                .arg("-inf")
                .arg(format!("({}", cutoff.timestamp_millis()));
            if let Some(limit) = effective_limit(limit) {
                cmd.arg("LIMIT").arg(0).arg(limit);
            }
            let ids: Vec<i64> = cmd.query_async(&mut conn).await?;
            if ids.is_empty() {
                return Ok(0);
            }

            let tokens = Self::load(&mut conn, &ids).await?;

            // 记录已不存在的ID只清理有序集合
            let orphans: Vec<i64> = ids
                .iter()
                .copied()
                .filter(|id| !tokens.iter().any(|t| t.id == *id))
                .collect();
            if !orphans.is_empty() {
                tracing::debug!("Dropping {} orphaned login token index entries", orphans.len());
                let _: () = conn.zrem(LOGIN_TOKEN_LAST_LOGIN_KEY, orphans).await?;
            }

            if !tokens.is_empty() {
                return Self::remove(&mut conn, &tokens).await;
            }
        }
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<LoginToken>, StoreError> {
        let mut conn = self.connection().await?;
        let mut tokens = Self::user_tokens(&mut conn, user_id).await?;
        tokens.sort_by(|a, b| b.last_login.cmp(&a.last_login).then(b.id.cmp(&a.id)));
        Ok(tokens)
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let tokens = Self::user_tokens(&mut conn, user_id).await?;
        Self::remove(&mut conn, &tokens).await?;
        Ok(())
    }

    async fn delete_by_id_for_user(&self, user_id: i64, id: i64) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let tokens: Vec<LoginToken> = Self::load(&mut conn, &[id])
            .await?
            .into_iter()
            .filter(|t| t.user_id == user_id)
            .collect();
        Self::remove(&mut conn, &tokens).await?;
        Ok(())
    }
}
