pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod services;
pub mod utils;

pub use error::{CredentialError, LoginTokenError, StoreError};
pub use services::{
    ClientInfo, ExternalSessionService, LoginTokenService, RememberCredential, RememberLogin,
    RememberMeManager,
};
