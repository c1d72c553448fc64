// 外部会话存储库
// 基于 PostgreSQL 的 ExternalSessionStore 实现

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::database::models::ExternalSession;
use crate::database::store::{ExternalSessionStore, effective_limit};
use crate::error::StoreError;

/// 外部会话存储库
#[derive(Clone)]
pub struct ExternalSessionOperation {
    db: Arc<PgPool>,
}

impl ExternalSessionOperation {
    pub fn new(db: Arc<PgPool>) -> Self {
        Self { db }
    }
}

impl ExternalSessionStore for ExternalSessionOperation {
    async fn insert(
        &self,
        session_id: &str,
        external_session_id: &str,
    ) -> Result<ExternalSession, StoreError> {
        let session = sqlx::query_as::<_, ExternalSession>(
            r#"
            INSERT INTO external_session (session_id, external_session_id, created)
            VALUES ($1, $2, NOW())
            RETURNING id, session_id, external_session_id, created
            "#,
        )
        .bind(session_id)
        .bind(external_session_id)
        .fetch_one(&*self.db)
        .await?;

        Ok(session)
    }

    async fn find_by_external_session_id(
        &self,
        external_session_id: &str,
    ) -> Result<Vec<ExternalSession>, StoreError> {
        let sessions = sqlx::query_as::<_, ExternalSession>(
            r#"
            SELECT id, session_id, external_session_id, created
            FROM external_session
            WHERE external_session_id = $1
            ORDER BY id
            "#,
        )
        .bind(external_session_id)
        .fetch_all(&*self.db)
        .await?;

        Ok(sessions)
    }

    async fn delete_by_session_id(&self, session_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM external_session WHERE session_id = $1")
            .bind(session_id)
            .execute(&*self.db)
            .await?;

        Ok(())
    }

    async fn delete_created_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: Option<u64>,
    ) -> Result<u64, StoreError> {
        let limit = effective_limit(limit).map(|n| n.min(i64::MAX as u64) as i64);
        let result = sqlx::query(
            r#"
            DELETE FROM external_session
            WHERE id IN (
                SELECT id FROM external_session
                WHERE created < $1
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
}
