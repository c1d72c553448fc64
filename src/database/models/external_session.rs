use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 本地会话与外部会话的映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ExternalSession {
    pub id: i64,
    pub session_id: String,
    pub external_session_id: String,
    pub created: DateTime<Utc>,
}
