use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jsonwebtoken::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("Token expiry is past the largest representable date")]
    ExpiryOutOfRange,
    #[error("Malformed token payload: {0}")]
    MalformedPayload(String),
}

impl TokenError {
    /// Map a decoding failure, keeping expiry distinct from every other rejection.
    pub fn from_validation(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(err),
        }
    }
}

/// Failures reported by an identity store.
///
/// The `Display` text of the client-facing variants is returned verbatim to callers.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Unknown user and wrong password are deliberately indistinguishable.
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error("User name '{0}' is already taken.")]
    DuplicateUserName(String),
    #[error("User name '{0}' is invalid, can only contain letters or digits.")]
    InvalidUserName(String),
    #[error("{0}")]
    InvalidRoleName(String),
    #[error("User '{0}' was not found.")]
    UserNotFound(String),
    #[error("Role '{0}' does not exist.")]
    RoleNotFound(String),
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
    #[error("Identity store error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl IdentityError {
    /// Whether the failure was caused by the request rather than by the store itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IdentityError::InvalidCredentials
                | IdentityError::DuplicateUserName(_)
                | IdentityError::InvalidUserName(_)
                | IdentityError::InvalidRoleName(_)
        )
    }
}

/// JSON body of every error response from the account endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable description of what went wrong
    pub error: String,
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete request body, already joined into one message.
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Identity(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Identity(_) | ApiError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status.is_server_error() {
            tracing::error!(error = %self, "Account request failed");
            "An internal error occurred. Please try again.".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
