use std::sync::Arc;

use chrono::Utc;
use login_token_service::{
    ExternalSessionService, LoginTokenService, StoreError,
    cache::RedisLoginTokenStore,
    config::{Config, StoreBackend},
    database::{
        self, ExternalSessionOperation, ExternalSessionStore, LoginTokenOperation,
        MemoryExternalSessionStore, MemoryTokenStore, TokenStore,
    },
    services::sweep_in_batches,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!("Expiring login tokens using {:?} store", config.store_backend);

    let result = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = Arc::new(
                database::connect(&config)
                    .await
                    .expect("Failed to connect to Postgres"),
            );
            run(
                &config,
                LoginTokenService::new(LoginTokenOperation::new(pool.clone())),
                Some(ExternalSessionService::new(ExternalSessionOperation::new(pool))),
            )
            .await
        }
        StoreBackend::Redis => {
            let url = config.redis_url.clone().unwrap_or_default();
            let redis =
                Arc::new(redis::Client::open(url).expect("Failed to create Redis client"));
            // 外部会话映射只保存在数据库中
            run(
                &config,
                LoginTokenService::new(RedisLoginTokenStore::new(redis)),
                None::<ExternalSessionService<MemoryExternalSessionStore>>,
            )
            .await
        }
        StoreBackend::Memory => {
            tracing::warn!("Memory store selected, nothing persistent to expire");
            run(
                &config,
                LoginTokenService::new(MemoryTokenStore::new()),
                Some(ExternalSessionService::new(MemoryExternalSessionStore::new())),
            )
            .await
        }
    };

    if let Err(e) = result {
        tracing::error!("Expiration failed: {}", e);
        std::process::exit(1);
    }
}

async fn run<T, E>(
    config: &Config,
    tokens: LoginTokenService<T>,
    sessions: Option<ExternalSessionService<E>>,
) -> Result<(), StoreError>
where
    T: TokenStore,
    E: ExternalSessionStore,
{
    let Some(period) = config.expire_interval() else {
        return expire_once(config, &tokens, sessions.as_ref()).await;
    };

    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        // 单次失败只记录日志，等待下一轮
        if let Err(e) = expire_once(config, &tokens, sessions.as_ref()).await {
            tracing::error!("Expiration run failed: {}", e);
        }
    }
}

async fn expire_once<T, E>(
    config: &Config,
    tokens: &LoginTokenService<T>,
    sessions: Option<&ExternalSessionService<E>>,
) -> Result<(), StoreError>
where
    T: TokenStore,
    E: ExternalSessionStore,
{
    let cutoff = Utc::now() - config.expire_after();
    let pause = config.expire_batch_pause();

    let deleted = sweep_in_batches(config.expire_batch_size, pause, move |limit| {
        tokens.delete_expired(cutoff, limit)
    })
    .await?;
    tracing::info!("Removed {} login tokens older than {}", deleted, cutoff);

    if let Some(sessions) = sessions {
        let deleted = sweep_in_batches(config.expire_batch_size, pause, move |limit| {
            sessions.delete_expired(cutoff, limit)
        })
        .await?;
        tracing::info!("Removed {} external session mappings older than {}", deleted, cutoff);
    }

    Ok(())
}
