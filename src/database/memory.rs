//! 内存存储，用于测试与本地开发

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::database::models::{ExternalSession, LoginToken, NewLoginToken};
use crate::database::store::{ExternalSessionStore, TokenStore, effective_limit};
use crate::error::StoreError;

struct Table<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// 按 id 顺序删除满足条件的行，最多 `limit` 行
    fn delete_matching(&mut self, limit: Option<u64>, pred: impl Fn(&T) -> bool) -> u64 {
        let ids: Vec<i64> = self
            .rows
            .iter()
            .filter(|(_, row)| pred(row))
            .map(|(id, _)| *id)
            .take(effective_limit(limit).map_or(usize::MAX, |n| n as usize))
            .collect();
        for id in &ids {
            self.rows.remove(id);
        }
        ids.len() as u64
    }
}

/// 内存登录令牌存储，克隆后共享同一份数据
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<Mutex<Table<LoginToken>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, id: i64) -> Option<LoginToken> {
        self.inner.lock().await.rows.get(&id).cloned()
    }
}

impl TokenStore for MemoryTokenStore {
    async fn find_by_series(&self, series: &str) -> Result<Vec<LoginToken>, StoreError> {
        let table = self.inner.lock().await;
        Ok(table
            .rows
            .values()
            .filter(|t| t.series == series)
            .cloned()
            .collect())
    }

    async fn insert(&self, token: NewLoginToken) -> Result<LoginToken, StoreError> {
        let mut table = self.inner.lock().await;
        let id = table.allocate_id();
        let row = token.with_id(id);
        table.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        self.inner.lock().await.rows.remove(&id);
        Ok(())
    }

    async fn delete_by_series_except(
        &self,
        series: &str,
        keep_id: Option<i64>,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .rows
            .retain(|id, t| t.series != series || Some(*id) == keep_id);
        Ok(())
    }

    async fn delete_where_last_login_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: Option<u64>,
    ) -> Result<u64, StoreError> {
        let mut table = self.inner.lock().await;
        Ok(table.delete_matching(limit, |t| t.last_login < cutoff))
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<LoginToken>, StoreError> {
        let table = self.inner.lock().await;
        let mut tokens: Vec<LoginToken> = table
            .rows
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tokens.sort_by(|a, b| b.last_login.cmp(&a.last_login).then(b.id.cmp(&a.id)));
        Ok(tokens)
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .rows
            .retain(|_, t| t.user_id != user_id);
        Ok(())
    }

    async fn delete_by_id_for_user(&self, user_id: i64, id: i64) -> Result<(), StoreError> {
        let mut table = self.inner.lock().await;
        if table.rows.get(&id).is_some_and(|t| t.user_id == user_id) {
            table.rows.remove(&id);
        }
        Ok(())
    }
}

/// 内存外部会话存储
#[derive(Clone, Default)]
pub struct MemoryExternalSessionStore {
    inner: Arc<Mutex<Table<ExternalSession>>>,
}

impl MemoryExternalSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// 以指定创建时间插入，便于测试过期清理
    pub async fn insert_created_at(
        &self,
        session_id: &str,
        external_session_id: &str,
        created: DateTime<Utc>,
    ) -> ExternalSession {
        let mut table = self.inner.lock().await;
        let id = table.allocate_id();
        let row = ExternalSession {
            id,
            session_id: session_id.to_string(),
            external_session_id: external_session_id.to_string(),
            created,
        };
        table.rows.insert(id, row.clone());
        row
    }
}

impl ExternalSessionStore for MemoryExternalSessionStore {
    async fn insert(
        &self,
        session_id: &str,
        external_session_id: &str,
    ) -> Result<ExternalSession, StoreError> {
        Ok(self
            .insert_created_at(session_id, external_session_id, Utc::now())
            .await)
    }

    async fn find_by_external_session_id(
        &self,
        external_session_id: &str,
    ) -> Result<Vec<ExternalSession>, StoreError> {
        let table = self.inner.lock().await;
        Ok(table
            .rows
            .values()
            .filter(|s| s.external_session_id == external_session_id)
            .cloned()
            .collect())
    }

    async fn delete_by_session_id(&self, session_id: &str) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .rows
            .retain(|_, s| s.session_id != session_id);
        Ok(())
    }

    async fn delete_created_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: Option<u64>,
    ) -> Result<u64, StoreError> {
        let mut table = self.inner.lock().await;
        Ok(table.delete_matching(limit, |s| s.created < cutoff))
    }
}
