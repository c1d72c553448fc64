// 登录令牌存储库
// 基于 PostgreSQL 的 TokenStore 实现

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::database::models::{LoginToken, NewLoginToken};
use crate::database::store::{TokenStore, effective_limit};
use crate::error::StoreError;

const LOGIN_TOKEN_COLUMNS: &str = "id, user_id, token_hash, series, last_login, browser, platform, expires, last_session_id";

/// 登录令牌存储库，处理所有与 login_token 表相关的数据库操作
#[derive(Clone)]
pub struct LoginTokenOperation {
    db: Arc<PgPool>,
}

impl LoginTokenOperation {
    /// 创建新的登录令牌存储库实例
    pub fn new(db: Arc<PgPool>) -> Self {
        Self { db }
    }
}

impl TokenStore for LoginTokenOperation {
    async fn find_by_series(&self, series: &str) -> Result<Vec<LoginToken>, StoreError> {
        let sql = format!("SELECT {LOGIN_TOKEN_COLUMNS} FROM login_token WHERE series = $1 ORDER BY id");
        let tokens = sqlx::query_as::<_, LoginToken>(&sql)
            .bind(series)
            .fetch_all(&*self.db)
            .await?;

        Ok(tokens)
    }

    async fn insert(&self, token: NewLoginToken) -> Result<LoginToken, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO login_token
                (user_id, token_hash, series, last_login, browser, platform, expires, last_session_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {LOGIN_TOKEN_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, LoginToken>(&sql)
            .bind(token.user_id)
            .bind(&token.token_hash)
            .bind(&token.series)
            .bind(token.last_login)
            .bind(&token.browser)
            .bind(&token.platform)
            .bind(token.expires)
            .bind(&token.last_session_id)
            .fetch_one(&*self.db)
            .await;

        match result {
            Ok(row) => {
                tracing::debug!("Inserted login token {} for user {}", row.id, row.user_id);
                Ok(row)
            }
            Err(e) => {
                tracing::error!("Failed to insert login token: {:?}", e);
                Err(e.into())
            }
        }
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM login_token WHERE id = $1")
            .bind(id)
            .execute(&*self.db)
            .await?;

        Ok(())
    }

    async fn delete_by_series_except(
        &self,
        series: &str,
        keep_id: Option<i64>,
    ) -> Result<(), StoreError> {
        // keep_id 为 NULL 时 "IS DISTINCT FROM" 对所有行成立
        sqlx::query("DELETE FROM login_token WHERE series = $1 AND id IS DISTINCT FROM $2")
            .bind(series)
            .bind(keep_id)
            .execute(&*self.db)
            .await?;

        Ok(())
    }

    async fn delete_where_last_login_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: Option<u64>,
    ) -> Result<u64, StoreError> {
        // LIMIT NULL 等同于不限制
        let limit = effective_limit(limit).map(|n| n.min(i64::MAX as u64) as i64);
        let result = sqlx::query(
            r#"
            DELETE FROM login_token
            WHERE id IN (
                SELECT id FROM login_token
                WHERE last_login < $1
                ORDER BY id
                LIMIT $2
            )
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .execute(&*self.db)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<LoginToken>, StoreError> {
        let sql = format!(
            "SELECT {LOGIN_TOKEN_COLUMNS} FROM login_token WHERE user_id = $1 ORDER BY last_login DESC, id DESC"
        );
        let tokens = sqlx::query_as::<_, LoginToken>(&sql)
            .bind(user_id)
            .fetch_all(&*self.db)
            .await?;

        Ok(tokens)
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM login_token WHERE user_id = $1")
            .bind(user_id)
            .execute(&*self.db)
            .await?;

        Ok(())
    }

    async fn delete_by_id_for_user(&self, user_id: i64, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM login_token WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&*self.db)
            .await?;

        Ok(())
    }
}
