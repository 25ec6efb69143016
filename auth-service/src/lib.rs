pub mod app;
pub mod config;
pub mod credentials;
pub mod error;
pub mod token_handlers;

pub use app::{build_router, AppState};
pub use config::{load_auth_config, AuthConfig};
pub use credentials::{hash_password, PgCredentialVerifier};
pub use error::SessionError;
