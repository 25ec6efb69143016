use std::collections::HashMap;
use std::env;

use anyhow::{Context, Result};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use tracing::{info, warn};

use crate::error::{AuthError, AuthResult};

pub const DEFAULT_CURRENT_KID: &str = "current";
pub const DEFAULT_PREVIOUS_KID: &str = "previous";

#[derive(Clone)]
struct SigningKey {
    kid: String,
    algorithm: Algorithm,
    key: EncodingKey,
}

#[derive(Clone)]
struct VerificationKey {
    algorithm: Algorithm,
    key: DecodingKey,
}

/// Signing material loaded once at startup. Tokens are signed with the current key;
/// any key in the set verifies, so tokens minted before a rollover stay valid until
/// they expire.
#[derive(Clone, Default)]
pub struct KeySet {
    signing: Option<SigningKey>,
    verifying: HashMap<String, VerificationKey>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared-secret key that both signs and verifies.
    pub fn hmac(kid: impl Into<String>, secret: &[u8]) -> Self {
        Self::new().with_hmac_signing(kid, secret)
    }

    pub fn with_hmac_signing(mut self, kid: impl Into<String>, secret: &[u8]) -> Self {
        let kid = kid.into();
        self.signing = Some(SigningKey {
            kid: kid.clone(),
            algorithm: Algorithm::HS256,
            key: EncodingKey::from_secret(secret),
        });
        self.verifying.insert(
            kid,
            VerificationKey { algorithm: Algorithm::HS256, key: DecodingKey::from_secret(secret) },
        );
        self
    }

    /// Verification-only shared secret, typically the key being rotated out.
    pub fn with_hmac_verifier(mut self, kid: impl Into<String>, secret: &[u8]) -> Self {
        self.verifying.insert(
            kid.into(),
            VerificationKey { algorithm: Algorithm::HS256, key: DecodingKey::from_secret(secret) },
        );
        self
    }

    pub fn with_rsa_signing_pem(mut self, kid: impl Into<String>, pem: &[u8]) -> AuthResult<Self> {
        let kid = kid.into();
        let key = EncodingKey::from_rsa_pem(pem)
            .map_err(|err| AuthError::KeyParse(kid.clone(), err.to_string()))?;
        self.signing = Some(SigningKey { kid, algorithm: Algorithm::RS256, key });
        Ok(self)
    }

    pub fn with_rsa_public_pem(mut self, kid: impl Into<String>, pem: &[u8]) -> AuthResult<Self> {
        let kid = kid.into();
        let key = DecodingKey::from_rsa_pem(pem)
            .map_err(|err| AuthError::KeyParse(kid.clone(), err.to_string()))?;
        self.verifying
            .insert(kid, VerificationKey { algorithm: Algorithm::RS256, key });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.verifying.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verifying.is_empty()
    }

    pub fn signing_kid(&self) -> Option<&str> {
        self.signing.as_ref().map(|key| key.kid.as_str())
    }

    pub(crate) fn signing_key(&self) -> AuthResult<(&str, Algorithm, &EncodingKey)> {
        self.signing
            .as_ref()
            .map(|key| (key.kid.as_str(), key.algorithm, &key.key))
            .ok_or(AuthError::MissingSigningKey)
    }

    pub(crate) fn verification_key(&self, kid: &str) -> Option<(Algorithm, &DecodingKey)> {
        self.verifying.get(kid).map(|key| (key.algorithm, &key.key))
    }

    /// Build from `TOKEN_SIGNING_SECRET` (HS256) or the `TOKEN_*_PEM` variables (RS256).
    /// Services that only verify may omit the private key.
    pub fn from_env() -> Result<Self> {
        let current_kid = env::var("TOKEN_SIGNING_KID").unwrap_or_else(|_| DEFAULT_CURRENT_KID.to_string());
        let previous_kid = env::var("TOKEN_PREVIOUS_KID").unwrap_or_else(|_| DEFAULT_PREVIOUS_KID.to_string());

        let mut keys = if let Ok(secret) = env::var("TOKEN_SIGNING_SECRET") {
            anyhow::ensure!(secret.len() >= 32, "TOKEN_SIGNING_SECRET must be at least 32 bytes");
            let mut keys = KeySet::hmac(current_kid.clone(), secret.as_bytes());
            if let Ok(previous) = env::var("TOKEN_PREVIOUS_SECRET") {
                keys = keys.with_hmac_verifier(previous_kid.clone(), previous.as_bytes());
            }
            keys
        } else {
            let mut keys = KeySet::new();
            if let Ok(pem) = env::var("TOKEN_PRIVATE_KEY_PEM") {
                keys = keys
                    .with_rsa_signing_pem(current_kid.clone(), pem.as_bytes())
                    .context("TOKEN_PRIVATE_KEY_PEM is not a valid RSA key")?;
            }
            if let Ok(pem) = env::var("TOKEN_PUBLIC_KEY_PEM") {
                keys = keys
                    .with_rsa_public_pem(current_kid.clone(), pem.as_bytes())
                    .context("TOKEN_PUBLIC_KEY_PEM is not a valid RSA key")?;
            }
            if let Ok(pem) = env::var("TOKEN_PREVIOUS_PUBLIC_KEY_PEM") {
                keys = keys
                    .with_rsa_public_pem(previous_kid.clone(), pem.as_bytes())
                    .context("TOKEN_PREVIOUS_PUBLIC_KEY_PEM is not a valid RSA key")?;
            }
            keys
        };

        anyhow::ensure!(
            !keys.is_empty(),
            "no token keys configured; set TOKEN_SIGNING_SECRET or TOKEN_PUBLIC_KEY_PEM"
        );
        if keys.signing.is_none() {
            warn!("token key-set has no signing key; this process can verify but not issue");
        }
        keys.verifying.shrink_to_fit();
        info!(kids = keys.len(), signing_kid = ?keys.signing_kid(), "token key-set loaded");
        Ok(keys)
    }
}
