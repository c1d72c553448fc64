use thiserror::Error;

/// 存储层错误，原样向上传递，不做重试
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 登录令牌校验错误
#[derive(Debug, Error)]
pub enum LoginTokenError {
    /// 系列存在但令牌不匹配，可能是令牌被盗用后重放
    #[error("login token mismatch for user {user_id}")]
    TokenMismatch { user_id: i64 },

    /// 令牌有效期超出可表示的时间范围
    #[error("login token lifetime overflows the expiry timestamp")]
    ExpiryOutOfRange,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LoginTokenError {
    /// 不匹配时返回受影响的用户ID
    pub fn mismatched_user(&self) -> Option<i64> {
        match self {
            LoginTokenError::TokenMismatch { user_id } => Some(*user_id),
            LoginTokenError::ExpiryOutOfRange | LoginTokenError::Store(_) => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("malformed remember-me credential")]
    Malformed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}
