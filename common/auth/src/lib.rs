pub mod claims;
pub mod codec;
pub mod config;
pub mod credentials;
pub mod error;
pub mod extractors;
pub mod keys;
pub mod roles;

pub use claims::{ClaimInput, IdentityClaim, EPHEMERAL_SUBJECT_PREFIX, STATION_SUBJECT_PREFIX};
pub use codec::{IssuedToken, TokenCodec};
pub use config::TokenConfig;
pub use credentials::{CredentialError, CredentialVerifier, VerifiedCredential};
pub use error::{AuthError, AuthResult};
pub use extractors::{bearer_from_headers, parse_bearer, AuthContext};
pub use keys::KeySet;
pub use roles::{Role, Tier};
