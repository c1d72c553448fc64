// 数据库模块
// 包含数据库实体定义、存储端口和各存储实现

pub mod memory;
pub mod models; // 数据库实体定义
pub mod operations; // PostgreSQL 存储实现
pub mod store; // 存储端口

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;
use crate::error::{ConfigError, StoreError};

// 重新导出常用类型，方便其他模块使用
pub use memory::{MemoryExternalSessionStore, MemoryTokenStore};
pub use models::{ExternalSession, LoginToken, NewLoginToken};
pub use operations::{ExternalSessionOperation, LoginTokenOperation};
pub use store::{ExternalSessionStore, TokenStore};

/// 按配置建立 PostgreSQL 连接池并执行迁移
pub async fn connect(config: &Config) -> Result<PgPool, StoreError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| sqlx::Error::Configuration(Box::new(ConfigError::Missing("DATABASE_URL"))))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(url)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(sqlx::Error::from)?;
    tracing::info!("Database migrations applied");
    Ok(())
}
