use axum::{http::{StatusCode, HeaderValue}, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use uuid::Uuid;

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")] pub missing_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")] pub trace_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")] pub message: Option<String>,
}

/// Error envelope shared by every service. Each variant pins the HTTP status; the
/// `code` is echoed in the body and in the `X-Error-Code` header.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized { code: &'static str, trace_id: Option<Uuid> },
    ForbiddenMissingScope { scope: String, trace_id: Option<Uuid> },
    Forbidden { code: &'static str, trace_id: Option<Uuid> },
    BadRequest { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    NotFound { code: &'static str, trace_id: Option<Uuid> },
    Conflict { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    PaymentRequired { code: &'static str, trace_id: Option<Uuid>, message: Option<String> },
    BadGateway { code: &'static str, trace_id: Option<Uuid> },
    ServiceUnavailable { code: &'static str, trace_id: Option<Uuid> },
    GatewayTimeout { code: &'static str, trace_id: Option<Uuid> },
    Internal { trace_id: Option<Uuid>, message: Option<String> },
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(e: E, trace_id: Option<Uuid>) -> Self { Self::Internal { trace_id, message: Some(e.to_string()) } }
    pub fn bad_request(code: &'static str, trace_id: Option<Uuid>) -> Self { Self::BadRequest { code, trace_id, message: None } }
    pub fn conflict(code: &'static str, message: impl Into<String>, trace_id: Option<Uuid>) -> Self { Self::Conflict { code, trace_id, message: Some(message.into()) } }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::ForbiddenMissingScope { .. } | ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
            ApiError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            ApiError::ForbiddenMissingScope { .. } => "insufficient_scope",
            ApiError::Internal { .. } => "internal_error",
            ApiError::Unauthorized { code, .. }
            | ApiError::Forbidden { code, .. }
            | ApiError::BadRequest { code, .. }
            | ApiError::NotFound { code, .. }
            | ApiError::Conflict { code, .. }
            | ApiError::PaymentRequired { code, .. }
            | ApiError::BadGateway { code, .. }
            | ApiError::ServiceUnavailable { code, .. }
            | ApiError::GatewayTimeout { code, .. } => code,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.code().to_string();
        let body = match self {
            ApiError::ForbiddenMissingScope { scope, trace_id } => {
                ErrorBody { code: error_code.clone(), missing_scope: Some(scope), trace_id, message: None }
            }
            ApiError::BadRequest { trace_id, message, .. }
            | ApiError::Conflict { trace_id, message, .. }
            | ApiError::PaymentRequired { trace_id, message, .. }
            | ApiError::Internal { trace_id, message } => {
                ErrorBody { code: error_code.clone(), missing_scope: None, trace_id, message }
            }
            ApiError::Unauthorized { trace_id, .. }
            | ApiError::Forbidden { trace_id, .. }
            | ApiError::NotFound { trace_id, .. }
            | ApiError::BadGateway { trace_id, .. }
            | ApiError::ServiceUnavailable { trace_id, .. }
            | ApiError::GatewayTimeout { trace_id, .. } => {
                ErrorBody { code: error_code.clone(), missing_scope: None, trace_id, message: None }
            }
        };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(&error_code) {
            resp.headers_mut().insert(ERROR_CODE_HEADER, val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
