//! Bearer token verification and scope checks.
//!
//! - `claims` - verified token payload and the request-scoped permission context
//! - `jwks` - trusted signing keys, inline or fetched from the issuer
//! - `gate` - the authorize step run in front of protected routes

pub mod claims;
pub mod gate;
pub mod jwks;

use axum::http::StatusCode;
use thiserror::Error;

pub use claims::{Claims, ClaimsContext};
pub use gate::{extract_bearer_token, AuthGate};
pub use jwks::{KeySource, RemoteKeySet};

/// Why a request was refused by the authorization gate.
///
/// `Display` output is for logs only. Callers see `code()` and
/// `description()`, which never include token contents.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingHeader,

    #[error("malformed authorization header: {0}")]
    MalformedHeader(&'static str),

    #[error("token could not be decoded: {0}")]
    InvalidToken(&'static str),

    #[error("no trusted key matches the token key id")]
    UnknownKey,

    #[error("token expired")]
    TokenExpired,

    #[error("token audience or issuer rejected")]
    InvalidClaims,

    #[error("token carries no permissions claim")]
    MissingPermissions,

    #[error("permission '{0}' not granted")]
    InsufficientScope(String),

    #[error("signing keys unavailable: {0}")]
    KeySetUnavailable(String),

    #[error("authorization misconfigured: {0}")]
    Configuration(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingHeader
            | AuthError::MalformedHeader(_)
            | AuthError::InvalidToken(_)
            | AuthError::UnknownKey
            | AuthError::TokenExpired
            | AuthError::InvalidClaims => StatusCode::UNAUTHORIZED,
            AuthError::MissingPermissions => StatusCode::BAD_REQUEST,
            AuthError::InsufficientScope(_) => StatusCode::FORBIDDEN,
            AuthError::KeySetUnavailable(_) | AuthError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "authorization_header_missing",
            AuthError::MalformedHeader(_) | AuthError::InvalidToken(_) | AuthError::UnknownKey => {
                "invalid_header"
            }
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims | AuthError::MissingPermissions => "invalid_claims",
            AuthError::InsufficientScope(_) => "unauthorized",
            AuthError::KeySetUnavailable(_) | AuthError::Configuration(_) => "internal_error",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            AuthError::MissingHeader => "Authorization header is expected.",
            AuthError::MalformedHeader(msg) | AuthError::InvalidToken(msg) => *msg,
            AuthError::UnknownKey => "Unable to find the appropriate key.",
            AuthError::TokenExpired => "Token expired.",
            AuthError::InvalidClaims => "Incorrect claims. Please, check the audience and issuer.",
            AuthError::MissingPermissions => "Permissions not included in JWT.",
            AuthError::InsufficientScope(_) => "Permission not found.",
            AuthError::KeySetUnavailable(_) | AuthError::Configuration(_) => "An error occurred",
        }
    }
}
