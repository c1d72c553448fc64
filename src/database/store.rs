//! 存储端口
//!
//! 校验逻辑只依赖这里的 trait，具体存储（PostgreSQL、Redis、内存）在各自模块中实现。

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::database::models::{ExternalSession, LoginToken, NewLoginToken};
use crate::error::StoreError;

/// 登录令牌存储
pub trait TokenStore: Send + Sync {
    /// 按系列查找所有令牌（通常0或1条）
    fn find_by_series(
        &self,
        series: &str,
    ) -> impl Future<Output = Result<Vec<LoginToken>, StoreError>> + Send;

    fn insert(
        &self,
        token: NewLoginToken,
    ) -> impl Future<Output = Result<LoginToken, StoreError>> + Send;

    fn delete_by_id(&self, id: i64) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// 删除系列中除 `keep_id` 以外的所有令牌，`keep_id` 为空时删除整个系列
    fn delete_by_series_except(
        &self,
        series: &str,
        keep_id: Option<i64>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// 删除 `last_login < cutoff` 的令牌，`limit` 限制单次删除的行数
    fn delete_where_last_login_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: Option<u64>,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// 按最近登录时间倒序返回用户的所有令牌
    fn find_by_user(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<LoginToken>, StoreError>> + Send;

    fn delete_by_user(&self, user_id: i64) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// 仅当令牌属于该用户时删除
    fn delete_by_id_for_user(
        &self,
        user_id: i64,
        id: i64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// 外部会话映射存储
pub trait ExternalSessionStore: Send + Sync {
    fn insert(
        &self,
        session_id: &str,
        external_session_id: &str,
    ) -> impl Future<Output = Result<ExternalSession, StoreError>> + Send;

    fn find_by_external_session_id(
        &self,
        external_session_id: &str,
    ) -> impl Future<Output = Result<Vec<ExternalSession>, StoreError>> + Send;

    fn delete_by_session_id(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete_created_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: Option<u64>,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// `Some(0)` 与 `None` 都表示不限制
pub(crate) fn effective_limit(limit: Option<u64>) -> Option<u64> {
    limit.filter(|n| *n > 0)
}
