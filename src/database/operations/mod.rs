/// 数据库操作
/// 基于 PostgreSQL 的存储实现

pub mod external_session;
pub mod login_token;

pub use external_session::ExternalSessionOperation;
pub use login_token::LoginTokenOperation;
