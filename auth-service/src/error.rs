use common_auth::{AuthError, CredentialError, Role};
use common_http_errors::ApiError;
use common_security::{IdentityError, MembershipError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("email or password rejected")]
    InvalidCredentials,
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error("user is not a member of the requested restaurant")]
    RestaurantAccessDenied,
    #[error(transparent)]
    Membership(#[from] MembershipError),
    #[error("guest sessions are disabled")]
    GuestSessionsDisabled,
    #[error("role '{0}' cannot hold a station token")]
    InvalidStationRole(Role),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Token(#[from] AuthError),
}

impl SessionError {
    pub fn into_api_error(self, trace_id: Option<Uuid>) -> ApiError {
        match self {
            SessionError::InvalidCredentials => ApiError::Unauthorized { code: "invalid_credentials", trace_id },
            SessionError::Credentials(CredentialError::Unavailable(_)) => {
                ApiError::ServiceUnavailable { code: "credential_store_unavailable", trace_id }
            }
            SessionError::Credentials(err @ CredentialError::Corrupt(_)) => ApiError::internal(err, trace_id),
            SessionError::RestaurantAccessDenied => {
                ApiError::Forbidden { code: "restaurant_access_denied", trace_id }
            }
            SessionError::Membership(_) => ApiError::ServiceUnavailable { code: "membership_unavailable", trace_id },
            SessionError::GuestSessionsDisabled => {
                ApiError::Forbidden { code: "guest_sessions_disabled", trace_id }
            }
            SessionError::InvalidStationRole(role) => ApiError::BadRequest {
                code: "invalid_station_role",
                trace_id,
                message: Some(format!("role '{role}' cannot hold a station token")),
            },
            SessionError::Identity(_) => ApiError::Unauthorized { code: "unauthenticated", trace_id },
            SessionError::Token(err) => ApiError::from(err),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        err.into_api_error(None)
    }
}
