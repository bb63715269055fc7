//! # HTTP API Errors
//!
//! Translates the ledger and scope taxonomies into HTTP responses. The
//! mapping is fixed: every taxonomy kind has exactly one status code, and
//! insufficient-funds responses carry both figures in the body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::scope::ScopeError;

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// API errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Ledger operation failure
    #[error("{0}")]
    Ledger(#[from] LedgerError),

    /// Scope establishment failure
    #[error("{0}")]
    Scope(#[from] ScopeError),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Ledger(err) => match err {
                LedgerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                LedgerError::AllocationNotFound | LedgerError::UsageNotFound => {
                    StatusCode::NOT_FOUND
                }
                LedgerError::Forbidden => StatusCode::FORBIDDEN,
                LedgerError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
                LedgerError::Closed { .. } => StatusCode::CONFLICT,
                LedgerError::DeleteBlocked { .. } => StatusCode::CONFLICT,
                LedgerError::TransientConflict => StatusCode::SERVICE_UNAVAILABLE,
                LedgerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Scope(err) => StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::UNAUTHORIZED),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Ledger(err) => err.code(),
            ApiError::Scope(_) => "UNAUTHENTICATED",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested: Option<Decimal>,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        let (available, requested) = match err {
            ApiError::Ledger(LedgerError::InsufficientFunds {
                available,
                requested,
            }) => (Some(*available), Some(*requested)),
            _ => (None, None),
        };

        Self {
            error: err.to_string(),
            code: err.status_code().as_u16(),
            kind: err.code(),
            available,
            requested,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(&self));
        (status, body).into_response()
    }
}
