use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Utc};

use crate::database::models::LoginToken;
use crate::database::store::TokenStore;
use crate::error::{CredentialError, LoginTokenError, StoreError};
use crate::services::login_token::LoginTokenService;
use crate::utils::{generate_series, generate_token};

/// "记住我"凭据，格式为 `series;token`
#[derive(Clone, PartialEq, Eq)]
pub struct RememberCredential {
    pub series: String,
    pub token: String,
}

impl fmt::Display for RememberCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.series, self.token)
    }
}

// 不在日志中输出令牌明文
impl fmt::Debug for RememberCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RememberCredential")
            .field("series", &self.series)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl FromStr for RememberCredential {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (series, token) = s.split_once(';').ok_or(CredentialError::Malformed)?;
        if series.is_empty() || token.is_empty() || token.contains(';') {
            return Err(CredentialError::Malformed);
        }
        Ok(Self {
            series: series.to_string(),
            token: token.to_string(),
        })
    }
}

/// 凭据登录成功的结果，`credential` 是轮换后的新凭据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RememberLogin {
    pub user_id: i64,
    pub credential: RememberCredential,
}

/// 客户端信息
#[derive(Debug, Clone, Default)]
pub struct ClientInfo<'a> {
    pub session_id: &'a str,
    pub browser: &'a str,
    pub platform: &'a str,
}

/// 管理"记住我"令牌的完整生命周期：签发、轮换、盗用响应与注销
#[derive(Clone)]
pub struct RememberMeManager<S> {
    tokens: LoginTokenService<S>,
    lifetime: Duration,
}

impl<S: TokenStore> RememberMeManager<S> {
    pub fn new(tokens: LoginTokenService<S>, lifetime: Duration) -> Self {
        Self { tokens, lifetime }
    }

    pub fn tokens(&self) -> &LoginTokenService<S> {
        &self.tokens
    }

    /// 主认证成功且用户勾选"记住我"时签发新系列
    pub async fn issue(
        &self,
        user_id: i64,
        client: &ClientInfo<'_>,
    ) -> Result<RememberCredential, LoginTokenError> {
        let series = generate_series();
        let credential = self.persist(user_id, series, client).await?.1;
        tracing::info!("Issued remember-me token for user {}", user_id);
        Ok(credential)
    }

    /// 用凭据登录，成功后在同一系列内轮换令牌
    ///
    /// 检测到不匹配时会删除该用户的所有令牌（强制所有设备退出），并把错误交还调用方。
    pub async fn login(
        &self,
        credential: &RememberCredential,
        client: &ClientInfo<'_>,
    ) -> Result<Option<RememberLogin>, LoginTokenError> {
        let matched = match self
            .tokens
            .match_token(&credential.series, &credential.token)
            .await
        {
            Ok(matched) => matched,
            Err(LoginTokenError::TokenMismatch { user_id }) => {
                tracing::warn!(
                    "Possible stolen login token for user {}, logging out everywhere",
                    user_id
                );
                // 删除失败也必须把盗用信号交还调用方
                if let Err(e) = self.tokens.delete_by_user(user_id).await {
                    tracing::error!(
                        "Failed to remove login tokens of user {} after mismatch: {}",
                        user_id,
                        e
                    );
                }
                return Err(LoginTokenError::TokenMismatch { user_id });
            }
            Err(e) => return Err(e),
        };

        let Some(current) = matched else {
            return Ok(None);
        };

        let (row, rotated) = self
            .persist(current.user_id, current.series.clone(), client)
            .await?;
        if let Err(e) = self
            .tokens
            .delete_by_series(&current.series, Some(row.id))
            .await
        {
            // 旧令牌仍有效，撤回新令牌，系列中只保留一个可用密钥
            tracing::error!(
                "Failed to remove rotated login tokens for user {}: {}",
                current.user_id,
                e
            );
            if let Err(withdraw) = self.tokens.store().delete_by_id(row.id).await {
                tracing::error!("Failed to withdraw login token {}: {}", row.id, withdraw);
            }
            return Err(e.into());
        }

        tracing::info!("Rotated login token for user {}", current.user_id);
        Ok(Some(RememberLogin {
            user_id: current.user_id,
            credential: rotated,
        }))
    }

    /// 当前设备退出：删除整个系列
    pub async fn forget(&self, credential: &RememberCredential) -> Result<(), StoreError> {
        self.tokens.delete_by_series(&credential.series, None).await
    }

    /// 所有设备退出
    pub async fn logout_everywhere(&self, user_id: i64) -> Result<(), StoreError> {
        tracing::info!("Removing all login tokens for user {}", user_id);
        self.tokens.delete_by_user(user_id).await
    }

    async fn persist(
        &self,
        user_id: i64,
        series: String,
        client: &ClientInfo<'_>,
    ) -> Result<(LoginToken, RememberCredential), LoginTokenError> {
        let token = generate_token();
        let expires = Utc::now()
            .checked_add_signed(self.lifetime)
            .ok_or(LoginTokenError::ExpiryOutOfRange)?
            .timestamp();
        let row = self
            .tokens
            .create_and_persist_token(
                user_id,
                &token,
                &series,
                client.browser,
                client.platform,
                expires,
                client.session_id,
            )
            .await?;

        Ok((row, RememberCredential { series, token }))
    }
}
