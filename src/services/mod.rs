pub mod external_session;
pub mod login_token;
pub mod remember_me;
pub mod sweeper;

pub use external_session::ExternalSessionService;
pub use login_token::LoginTokenService;
pub use remember_me::{ClientInfo, RememberCredential, RememberLogin, RememberMeManager};
pub use sweeper::sweep_in_batches;
