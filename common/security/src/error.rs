use axum::response::{IntoResponse, Response};
use common_auth::AuthError;
use common_http_errors::ApiError;
use thiserror::Error;
use uuid::Uuid;

use crate::identity::IdentityError;

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error(transparent)]
    Unauthenticated(#[from] AuthError),
    #[error("identity rejected: {0}")]
    UnresolvableIdentity(#[from] IdentityError),
    #[error("missing X-Restaurant-ID header")]
    MissingRestaurant,
    #[error("X-Restaurant-ID is not a UUID")]
    InvalidRestaurant,
    #[error("restaurant access denied")]
    RestaurantAccessDenied,
    #[error("missing scope '{scope}'")]
    InsufficientScope { scope: String },
    #[error("membership store unavailable: {0}")]
    MembershipUnavailable(String),
}

impl SecurityError {
    pub fn into_api_error(self, trace_id: Option<Uuid>) -> ApiError {
        match self {
            SecurityError::Unauthenticated(err) => match ApiError::from(err) {
                ApiError::Unauthorized { code, .. } => ApiError::Unauthorized { code, trace_id },
                other => other,
            },
            SecurityError::UnresolvableIdentity(_) => ApiError::Unauthorized { code: "unauthenticated", trace_id },
            SecurityError::MissingRestaurant => ApiError::bad_request("missing_restaurant_id", trace_id),
            SecurityError::InvalidRestaurant => ApiError::bad_request("invalid_restaurant_id", trace_id),
            SecurityError::RestaurantAccessDenied => ApiError::Forbidden { code: "restaurant_access_denied", trace_id },
            SecurityError::InsufficientScope { scope } => ApiError::ForbiddenMissingScope { scope, trace_id },
            SecurityError::MembershipUnavailable(_) => {
                ApiError::ServiceUnavailable { code: "membership_unavailable", trace_id }
            }
        }
    }
}

impl From<SecurityError> for ApiError {
    fn from(err: SecurityError) -> Self {
        err.into_api_error(None)
    }
}

impl IntoResponse for SecurityError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
