//! Integration tests for the remember-me lifecycle: issue, rotate, theft response.

use chrono::{DateTime, Duration, Utc};
use login_token_service::database::{LoginToken, MemoryTokenStore, NewLoginToken, TokenStore};
use login_token_service::{
    ClientInfo, LoginTokenError, LoginTokenService, RememberCredential, RememberMeManager,
    StoreError,
};

const CLIENT: ClientInfo<'static> = ClientInfo {
    session_id: "sess-1",
    browser: "Firefox",
    platform: "Linux",
};

/// Memory store whose bulk deletes can be switched to fail like an unreachable database.
#[derive(Clone, Default)]
struct FailingDeleteStore {
    inner: MemoryTokenStore,
    fail_user_delete: bool,
    fail_series_delete: bool,
}

fn pool_timeout() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

impl TokenStore for FailingDeleteStore {
    async fn find_by_series(&self, series: &str) -> Result<Vec<LoginToken>, StoreError> {
        self.inner.find_by_series(series).await
    }

    async fn insert(&self, token: NewLoginToken) -> Result<LoginToken, StoreError> {
        self.inner.insert(token).await
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        self.inner.delete_by_id(id).await
    }

    async fn delete_by_series_except(
        &self,
        series: &str,
        keep_id: Option<i64>,
    ) -> Result<(), StoreError> {
        if self.fail_series_delete {
            return Err(pool_timeout());
        }
        self.inner.delete_by_series_except(series, keep_id).await
    }

    async fn delete_where_last_login_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: Option<u64>,
    ) -> Result<u64, StoreError> {
        self.inner.delete_where_last_login_before(cutoff, limit).await
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<LoginToken>, StoreError> {
        self.inner.find_by_user(user_id).await
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<(), StoreError> {
        if self.fail_user_delete {
            return Err(pool_timeout());
        }
        self.inner.delete_by_user(user_id).await
    }

    async fn delete_by_id_for_user(&self, user_id: i64, id: i64) -> Result<(), StoreError> {
        self.inner.delete_by_id_for_user(user_id, id).await
    }
}

fn setup() -> (MemoryTokenStore, RememberMeManager<MemoryTokenStore>) {
    let store = MemoryTokenStore::new();
    let manager = RememberMeManager::new(LoginTokenService::new(store.clone()), Duration::days(14));
    (store, manager)
}

#[tokio::test]
async fn issued_credential_logs_in_and_rotates() {
    let (store, manager) = setup();

    let issued = manager.issue(10, &CLIENT).await.unwrap();
    assert_eq!(store.len().await, 1);

    let login = manager
        .login(&issued, &CLIENT)
        .await
        .unwrap()
        .expect("fresh credential should log in");
    assert_eq!(login.user_id, 10);
    assert_eq!(login.credential.series, issued.series);
    assert_ne!(login.credential.token, issued.token);

    // 轮换后系列中只剩新令牌
    let rows = manager.tokens().get_by_user(10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].series, issued.series);

    // 新凭据可以继续使用
    let next = manager.login(&login.credential, &CLIENT).await.unwrap();
    assert!(next.is_some());
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn replayed_old_credential_logs_user_out_everywhere() {
    let (store, manager) = setup();

    let stolen = manager.issue(10, &CLIENT).await.unwrap();
    let _other_device = manager.issue(10, &CLIENT).await.unwrap();
    let _someone_else = manager.issue(11, &CLIENT).await.unwrap();

    // 合法用户先使用并轮换
    manager.login(&stolen, &CLIENT).await.unwrap().unwrap();
    assert_eq!(store.len().await, 3);

    // 攻击者重放旧令牌
    let err = manager.login(&stolen, &CLIENT).await.unwrap_err();
    assert!(matches!(err, LoginTokenError::TokenMismatch { user_id: 10 }));

    assert!(manager.tokens().get_by_user(10).await.unwrap().is_empty());
    assert_eq!(manager.tokens().get_by_user(11).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_credential_is_not_found() {
    let (_store, manager) = setup();
    let credential: RememberCredential = "nope;nothing".parse().unwrap();

    let result = manager.login(&credential, &CLIENT).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn expired_credential_is_not_found_and_removed() {
    let store = MemoryTokenStore::new();
    let manager = RememberMeManager::new(LoginTokenService::new(store.clone()), Duration::days(-1));

    let issued = manager.issue(3, &CLIENT).await.unwrap();
    let result = manager.login(&issued, &CLIENT).await.unwrap();
    assert!(result.is_none());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn forget_and_logout_everywhere() {
    let (store, manager) = setup();

    let a = manager.issue(1, &CLIENT).await.unwrap();
    let _b = manager.issue(1, &CLIENT).await.unwrap();
    assert_eq!(store.len().await, 2);

    manager.forget(&a).await.unwrap();
    assert_eq!(store.len().await, 1);
    assert!(manager.login(&a, &CLIENT).await.unwrap().is_none());

    manager.logout_everywhere(1).await.unwrap();
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn mismatch_is_reported_even_when_logout_everywhere_fails() {
    let inner = MemoryTokenStore::new();
    let healthy = RememberMeManager::new(LoginTokenService::new(inner.clone()), Duration::days(14));
    let stolen = healthy.issue(10, &CLIENT).await.unwrap();
    healthy.login(&stolen, &CLIENT).await.unwrap().unwrap();

    let store = FailingDeleteStore {
        inner: inner.clone(),
        fail_user_delete: true,
        ..Default::default()
    };
    let manager = RememberMeManager::new(LoginTokenService::new(store), Duration::days(14));

    let err = manager.login(&stolen, &CLIENT).await.unwrap_err();
    assert!(matches!(err, LoginTokenError::TokenMismatch { user_id: 10 }));
    assert_eq!(err.mismatched_user(), Some(10));
}

#[tokio::test]
async fn failed_rotation_cleanup_withdraws_new_token() {
    let inner = MemoryTokenStore::new();
    let store = FailingDeleteStore {
        inner: inner.clone(),
        fail_series_delete: true,
        ..Default::default()
    };
    let manager = RememberMeManager::new(LoginTokenService::new(store), Duration::days(14));

    let issued = manager.issue(4, &CLIENT).await.unwrap();
    let before = manager.tokens().get_by_user(4).await.unwrap();

    let err = manager.login(&issued, &CLIENT).await.unwrap_err();
    assert!(matches!(err, LoginTokenError::Store(StoreError::Database(_))));

    // 只剩原来的令牌，原凭据仍可使用
    assert_eq!(manager.tokens().get_by_user(4).await.unwrap(), before);
    assert_eq!(inner.len().await, 1);
}

#[tokio::test]
async fn oversized_lifetime_is_an_error_not_a_panic() {
    let (store, _) = setup();
    let manager = RememberMeManager::new(LoginTokenService::new(store.clone()), Duration::MAX);

    let err = manager.issue(1, &CLIENT).await.unwrap_err();
    assert!(matches!(err, LoginTokenError::ExpiryOutOfRange));
    assert!(store.is_empty().await);
}
