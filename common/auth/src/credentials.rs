use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::roles::Role;

/// Proof that an external credential check accepted a staff login. Persistent tokens
/// are only minted from one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredential {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
    #[error("stored credential is corrupt for user {0}")]
    Corrupt(Uuid),
}

/// Checks a login against wherever staff credentials live.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// `Ok(None)` means the credentials were wrong, the account is inactive, or no
    /// such account exists; callers must not distinguish these.
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<VerifiedCredential>, CredentialError>;
}
