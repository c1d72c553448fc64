/// 登录令牌缓存键前缀
const LOGIN_TOKEN_PREFIX: &str = "login_token:";

/// 系列索引键前缀
const LOGIN_TOKEN_SERIES_PREFIX: &str = "login_token:series:";

/// 用户索引键前缀
const LOGIN_TOKEN_USER_PREFIX: &str = "login_token:user:";

/// 按最近登录时间排序的索引
pub const LOGIN_TOKEN_LAST_LOGIN_KEY: &str = "login_token:by_last_login";

/// 自增ID计数器
pub const LOGIN_TOKEN_ID_KEY: &str = "login_token:next_id";

/// 生成令牌记录键
pub fn login_token_key(id: i64) -> String {
    format!("{}{}", LOGIN_TOKEN_PREFIX, id)
}

/// 生成系列索引键
pub fn login_token_series_key(series: &str) -> String {
    format!("{}{}", LOGIN_TOKEN_SERIES_PREFIX, series)
}

/// 生成用户索引键
pub fn login_token_user_key(user_id: i64) -> String {
    format!("{}{}", LOGIN_TOKEN_USER_PREFIX, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_do_not_collide() {
        assert_eq!(login_token_key(42), "login_token:42");
        assert_eq!(login_token_series_key("abc"), "login_token:series:abc");
        assert_eq!(login_token_user_key(7), "login_token:user:7");
        assert_ne!(login_token_key(1), LOGIN_TOKEN_ID_KEY);
    }
}
