// 缓存模块
// 基于 Redis 的令牌存储

pub mod keys;
pub mod operations;

pub use operations::RedisLoginTokenStore;
