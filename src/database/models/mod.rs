pub mod external_session;
pub mod login_token;

pub use external_session::ExternalSession;
pub use login_token::{LoginToken, NewLoginToken};
