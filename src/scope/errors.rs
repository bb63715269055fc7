//! Scope establishment errors
//!
//! Failures to turn a bearer token into a caller scope. These all map to
//! 401; a valid token whose scope does not cover the target is a ledger
//! `Forbidden`, not a scope error.

use thiserror::Error;

/// Result type for scope operations
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Scope errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// No Authorization header or no bearer token in it.
    #[error("missing bearer token")]
    MissingToken,

    /// Token could not be decoded or carries unusable claims.
    #[error("malformed token")]
    MalformedToken,

    /// Token signature does not verify against the configured secret.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Token expired.
    #[error("token expired")]
    TokenExpired,

    /// Token could not be signed (dev/test issuance only).
    #[error("token signing failed")]
    SigningFailed,
}

impl ScopeError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingToken
            | Self::MalformedToken
            | Self::InvalidSignature
            | Self::TokenExpired => 401,
            Self::SigningFailed => 500,
        }
    }
}
