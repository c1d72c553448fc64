use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// 令牌存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Redis,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid {
                name: "TOKEN_STORE",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub login_token_lifetime_days: u64,
    pub expire_after_days: u64,
    pub expire_batch_size: u64,
    pub expire_batch_pause_ms: u64,
    pub expire_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let store_backend = match env::var("TOKEN_STORE") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Postgres,
        };

        let config = Config {
            store_backend,
            database_url: env::var("DATABASE_URL").ok(),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "", 5)?,
            redis_url: env::var("REDIS_URL").ok(),
            login_token_lifetime_days: parse_days("LOGIN_TOKEN_LIFETIME_DAYS", 14)?,
            expire_after_days: parse_days("EXPIRE_AFTER_DAYS", 14)?,
            expire_batch_size: parse_var("EXPIRE_BATCH_SIZE", "", 1000)?,
            expire_batch_pause_ms: parse_var("EXPIRE_BATCH_PAUSE_MS", "ms", 100)?,
            expire_interval_secs: parse_var("EXPIRE_INTERVAL_SECS", "s", 0)?,
        };

        // 所选后端必须有对应的连接地址
        match config.store_backend {
            StoreBackend::Postgres if config.database_url.is_none() => {
                Err(ConfigError::Missing("DATABASE_URL"))
            }
            StoreBackend::Redis if config.redis_url.is_none() => {
                Err(ConfigError::Missing("REDIS_URL"))
            }
            _ => Ok(config),
        }
    }

    pub fn login_token_lifetime(&self) -> chrono::Duration {
        days(self.login_token_lifetime_days)
    }

    pub fn expire_after(&self) -> chrono::Duration {
        days(self.expire_after_days)
    }

    pub fn expire_batch_pause(&self) -> Duration {
        Duration::from_millis(self.expire_batch_pause_ms)
    }

    /// 为0时只执行一次清理
    pub fn expire_interval(&self) -> Option<Duration> {
        (self.expire_interval_secs > 0).then(|| Duration::from_secs(self.expire_interval_secs))
    }
}

/// 天数上限（约100年），超出会让过期时间溢出
pub const MAX_DAYS: u64 = 36_500;

fn days(count: u64) -> chrono::Duration {
    chrono::TimeDelta::try_days(count.min(MAX_DAYS) as i64).unwrap_or(chrono::TimeDelta::MAX)
}

fn parse_var<T: FromStr>(name: &'static str, unit: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_value(name, unit, &value),
        Err(_) => Ok(default),
    }
}

fn parse_days(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    bounded_days(name, parse_var(name, "d", default)?)
}

fn bounded_days(name: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value > MAX_DAYS {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn parse_value<T: FromStr>(name: &'static str, unit: &str, value: &str) -> Result<T, ConfigError> {
    // 只接受变量自身的单位后缀，例如 "14d"、"250ms"
    let trimmed = value.trim();
    let number = if unit.is_empty() {
        trimmed
    } else {
        trimmed.strip_suffix(unit).unwrap_or(trimmed)
    };
    number
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!(" Redis ".parse::<StoreBackend>().unwrap(), StoreBackend::Redis);
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("mysql".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn parses_values_with_unit_suffix() {
        assert_eq!(parse_value::<u64>("EXPIRE_AFTER_DAYS", "d", "14d").unwrap(), 14);
        assert_eq!(parse_value::<u64>("EXPIRE_AFTER_DAYS", "d", "14").unwrap(), 14);
        assert_eq!(parse_value::<u64>("EXPIRE_BATCH_PAUSE_MS", "ms", "250ms").unwrap(), 250);
        assert_eq!(parse_value::<u64>("EXPIRE_INTERVAL_SECS", "s", "30s").unwrap(), 30);
        assert_eq!(parse_value::<u32>("DATABASE_MAX_CONNECTIONS", "", " 8 ").unwrap(), 8);
    }

    #[test]
    fn rejects_foreign_unit_suffix() {
        for (name, unit, value) in [
            ("EXPIRE_AFTER_DAYS", "d", "2w"),
            ("EXPIRE_AFTER_DAYS", "d", "12h"),
            ("EXPIRE_BATCH_PAUSE_MS", "ms", "1s"),
            ("EXPIRE_INTERVAL_SECS", "s", "30ms"),
            ("EXPIRE_BATCH_SIZE", "", "10k"),
        ] {
            let err = parse_value::<u64>(name, unit, value).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{value:?}");
        }
    }

    #[test]
    fn rejects_garbage_values() {
        let err = parse_value::<u64>("EXPIRE_BATCH_SIZE", "", "lots").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "EXPIRE_BATCH_SIZE", .. }));
    }

    #[test]
    fn day_counts_above_limit_are_rejected() {
        assert_eq!(bounded_days("EXPIRE_AFTER_DAYS", MAX_DAYS).unwrap(), MAX_DAYS);
        let err = bounded_days("LOGIN_TOKEN_LIFETIME_DAYS", 200_000_000_000).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "LOGIN_TOKEN_LIFETIME_DAYS", .. }));
    }

    #[test]
    fn huge_day_counts_do_not_overflow() {
        let mut config = sample_config();
        config.expire_after_days = 200_000_000_000;
        config.login_token_lifetime_days = u64::MAX;
        assert_eq!(config.expire_after(), chrono::Duration::days(MAX_DAYS as i64));
        assert_eq!(config.login_token_lifetime(), chrono::Duration::days(MAX_DAYS as i64));
        assert!(chrono::Utc::now().checked_sub_signed(config.expire_after()).is_some());
    }

    #[test]
    fn zero_interval_means_run_once() {
        let config = sample_config();
        assert!(config.expire_interval().is_none());
        assert_eq!(config.login_token_lifetime(), chrono::Duration::days(14));
    }

    fn sample_config() -> Config {
        Config {
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 5,
            redis_url: None,
            login_token_lifetime_days: 14,
            expire_after_days: 14,
            expire_batch_size: 1000,
            expire_batch_pause_ms: 100,
            expire_interval_secs: 0,
        }
    }
}
