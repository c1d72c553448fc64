/// 缓存键模块
/// 提供各种缓存键生成函数

// 登录令牌缓存键模块
pub mod token_keys;

pub use token_keys::{
    LOGIN_TOKEN_ID_KEY, LOGIN_TOKEN_LAST_LOGIN_KEY, login_token_key, login_token_series_key,
    login_token_user_key,
};
