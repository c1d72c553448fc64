use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 持久登录令牌数据库实体，写入后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LoginToken {
    pub id: i64,
    pub user_id: i64,
    /// 令牌明文的摘要，明文从不落库
    pub token_hash: String,
    pub series: String,
    pub last_login: DateTime<Utc>,
    pub browser: String,
    pub platform: String,
    /// 过期时间（Unix 秒）
    pub expires: i64,
    pub last_session_id: String,
}

impl LoginToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.expires
    }
}

/// 待插入的登录令牌，`id` 由存储分配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLoginToken {
    pub user_id: i64,
    pub token_hash: String,
    pub series: String,
    pub last_login: DateTime<Utc>,
    pub browser: String,
    pub platform: String,
    pub expires: i64,
    pub last_session_id: String,
}

impl NewLoginToken {
    pub fn with_id(self, id: i64) -> LoginToken {
        LoginToken {
            id,
            user_id: self.user_id,
            token_hash: self.token_hash,
            series: self.series,
            last_login: self.last_login,
            browser: self.browser,
            platform: self.platform,
            expires: self.expires,
            last_session_id: self.last_session_id,
        }
    }
}
