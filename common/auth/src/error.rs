use axum::response::{IntoResponse, Response};
use common_http_errors::ApiError;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed: {0}")]
    Malformed(String),
    #[error("invalid claim '{0}' with value '{1}'")]
    InvalidClaim(&'static str, String),
    #[error("cannot issue token: {0}")]
    Issuance(String),
    #[error("no signing key configured")]
    MissingSigningKey,
    #[error("failed to parse key for kid '{0}': {1}")]
    KeyParse(String, String),
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("authorization header malformed")]
    InvalidAuthorization,
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match value.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidKeyFormat => Self::InvalidSignature,
            _ => Self::Malformed(value.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::Expired => ApiError::Unauthorized { code: "token_expired", trace_id: None },
            AuthError::MissingAuthorization
            | AuthError::InvalidAuthorization
            | AuthError::InvalidSignature
            | AuthError::Malformed(_)
            | AuthError::InvalidClaim(_, _) => ApiError::Unauthorized { code: "unauthenticated", trace_id: None },
            AuthError::Issuance(_) => ApiError::BadRequest {
                code: "token_issuance_rejected",
                trace_id: None,
                message: Some(value.to_string()),
            },
            AuthError::MissingSigningKey | AuthError::KeyParse(_, _) => ApiError::internal(value, None),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
