//! Bearer token authentication.
//!
//! Tokens are validated statelessly by the [`TokenService`](crate::token::TokenService);
//! no database lookup is involved.

use crate::AppResources;
use crate::token::{TokenError, ValidatedToken};
use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error type for authentication failures
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthError {
    /// Error code (e.g., "invalid_token")
    pub error: String,
    /// Human-readable error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl AuthError {
    pub fn invalid_token(description: impl Into<String>) -> Self {
        Self {
            error: "invalid_token".to_string(),
            error_description: Some(description.into()),
        }
    }

    pub fn server_error() -> Self {
        Self {
            error: "server_error".to_string(),
            error_description: None,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self.error.as_str() {
            "invalid_token" => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let challenge = if status == StatusCode::UNAUTHORIZED {
            Some([("www-authenticate", "Bearer error=\"invalid_token\"")])
        } else {
            None
        };
        (status, challenge, Json(self)).into_response()
    }
}

/// Axum extractor that validates `Authorization: Bearer <token>`.
///
/// # Example
///
/// ```ignore
/// async fn handler(BearerAuth(token): BearerAuth) -> impl IntoResponse {
///     format!("Hello, {}", token.issuer)
/// }
/// ```
pub struct BearerAuth(pub ValidatedToken);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let resources = parts
            .extensions
            .get::<AppResources>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("AppResources not found in extensions");
                AuthError::server_error()
            })?;

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = match auth_header {
            Some(header) => header.strip_prefix("Bearer ").ok_or_else(|| {
                AuthError::invalid_token("Authorization header must use Bearer scheme")
            })?,
            None => return Err(AuthError::invalid_token("Missing Authorization header")),
        };

        match resources.tokens.validate(token.trim()) {
            Ok(validated) => Ok(BearerAuth(validated)),
            Err(TokenError::Expired) => Err(AuthError::invalid_token("Token has expired")),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected bearer token");
                Err(AuthError::invalid_token("Token is not valid"))
            }
        }
    }
}
