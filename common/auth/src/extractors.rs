use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};

use crate::claims::IdentityClaim;
use crate::codec::TokenCodec;
use crate::error::{AuthError, AuthResult};

/// Verified claims for the bearer token on the request. Carries no restaurant
/// decision; handlers acting on a restaurant use the security context instead.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claim: IdentityClaim,
    pub token: String,
}

impl AuthContext {
    pub fn from_headers(headers: &HeaderMap, codec: &TokenCodec) -> AuthResult<Self> {
        let token = bearer_from_headers(headers)?;
        let claim = codec.verify(&token)?;
        Ok(Self { claim, token })
    }

    pub fn into_claim(self) -> IdentityClaim {
        self.claim
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<TokenCodec>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let codec = Arc::<TokenCodec>::from_ref(state);
        Self::from_headers(&parts.headers, &codec)
    }
}

pub fn bearer_from_headers(headers: &HeaderMap) -> AuthResult<String> {
    let header_value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthorization)?;
    parse_bearer(header_value)
}

pub fn parse_bearer(value: &axum::http::HeaderValue) -> AuthResult<String> {
    let raw = value
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorization)?
        .trim();

    let token = raw
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthorization)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidAuthorization);
    }

    Ok(token.to_owned())
}
