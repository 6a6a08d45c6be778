use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use portkey_analytics::AnalyticsError;
use portkey_core::StorageError;
use portkey_redirector::RedirectError;
use portkey_shortener::ShortenError;
use serde::Serialize;
use tracing::error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Gone(String),
    Forbidden,
    AliasTaken(String),
    Invalid(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("not found: {what}")),
            ApiError::Gone(code) => (StatusCode::GONE, format!("link expired: {code}")),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "not authorized to modify this link".to_string(),
            ),
            ApiError::AliasTaken(alias) => {
                (StatusCode::CONFLICT, format!("alias already exists: {alias}"))
            }
            ApiError::Invalid(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::Internal(message) => {
                // Detail goes to the log, not to the client.
                error!(error = %message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<ShortenError> for ApiError {
    fn from(value: ShortenError) -> Self {
        match value {
            ShortenError::AliasTaken(alias) => Self::AliasTaken(alias),
            ShortenError::NotFound(code) => Self::NotFound(code),
            ShortenError::Forbidden => Self::Forbidden,
            ShortenError::InvalidUrl(message) | ShortenError::InvalidShortCode(message) => {
                Self::Invalid(message)
            }
            ShortenError::AllocationExhausted(attempts) => {
                Self::Internal(format!("code allocation exhausted after {attempts} attempts"))
            }
            ShortenError::Storage(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<RedirectError> for ApiError {
    fn from(value: RedirectError) -> Self {
        match value {
            RedirectError::NotFound(code) => Self::NotFound(code),
            RedirectError::Gone(code) => Self::Gone(code),
            RedirectError::Storage(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(value: AnalyticsError) -> Self {
        match value {
            AnalyticsError::NotFound(code) => Self::NotFound(code),
            AnalyticsError::Storage(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(value: StorageError) -> Self {
        Self::Internal(value.to_string())
    }
}
