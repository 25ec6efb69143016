use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, decode_header, encode, Header, Validation};
use tracing::debug;
use uuid::Uuid;

use crate::claims::{ClaimInput, ClaimsRepr, IdentityClaim};
use crate::config::TokenConfig;
use crate::error::{AuthError, AuthResult};
use crate::keys::KeySet;

/// A freshly minted bearer token together with the claim it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claim: IdentityClaim,
}

impl IssuedToken {
    pub fn expires_in(&self) -> i64 {
        (self.claim.expires_at - self.claim.issued_at).num_seconds()
    }
}

/// Issues and verifies signed bearer tokens. Stateless apart from the immutable
/// configuration and key-set it was built with.
#[derive(Clone)]
pub struct TokenCodec {
    config: TokenConfig,
    keys: Arc<KeySet>,
}

impl TokenCodec {
    pub fn new(config: TokenConfig, keys: Arc<KeySet>) -> Self {
        Self { config, keys }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    pub fn issue(&self, input: &ClaimInput, scopes: &BTreeSet<String>) -> AuthResult<IssuedToken> {
        self.issue_at(input, scopes, Utc::now())
    }

    pub fn issue_at(
        &self,
        input: &ClaimInput,
        scopes: &BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let ttl = self.config.ttl_for(input.tier());
        if ttl <= chrono::Duration::zero() {
            return Err(AuthError::Issuance(format!(
                "{} token lifetime must be positive",
                input.tier().as_str()
            )));
        }
        let (subject_id, role, restaurant_id) = input.materialize()?;
        // Tokens carry whole seconds; truncate so the returned claim matches what
        // verification will decode.
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);

        let claim = IdentityClaim {
            subject_id,
            role,
            restaurant_id,
            scopes: scopes.clone(),
            issued_at,
            expires_at: issued_at + ttl,
            issuer: self.config.issuer.clone(),
            audience: vec![self.config.audience.clone()],
            token_id: Some(Uuid::new_v4().to_string()),
        };

        let (kid, algorithm, key) = self.keys.signing_key()?;
        let mut header = Header::new(algorithm);
        header.kid = Some(kid.to_string());
        let token = encode(&header, &ClaimsRepr::from(&claim), key)
            .map_err(|err| AuthError::Issuance(format!("failed to sign token: {err}")))?;

        debug!(kid, role = %claim.role, tier = input.tier().as_str(), "issued token");
        Ok(IssuedToken { token, claim })
    }

    pub fn verify(&self, token: &str) -> AuthResult<IdentityClaim> {
        let header = decode_header(token).map_err(|err| AuthError::Malformed(err.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::Malformed("token missing kid header".into()))?;
        let (algorithm, key) = self
            .keys
            .verification_key(&kid)
            .ok_or(AuthError::InvalidSignature)?;
        if header.alg != algorithm {
            return Err(AuthError::InvalidSignature);
        }

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[self.config.issuer.clone()]);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss", "aud"]);
        validation.leeway = self.config.leeway_seconds.into();

        let token_data = decode::<ClaimsRepr>(token, key, &validation)?;
        let claim = IdentityClaim::try_from(token_data.claims)?;
        debug!(kid, role = %claim.role, "verified token");
        Ok(claim)
    }
}
