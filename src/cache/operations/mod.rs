/// 缓存操作
/// 提供缓存操作的功能实现

pub mod token;

pub use token::RedisLoginTokenStore;
