//! Account endpoints.
//!
//! - `/login` - Verify credentials and issue a bearer token
//! - `/register` - Create a user and put it into the requested role
//! - `/me` - Echo the identity claims of a valid bearer token

use crate::AppResources;
use crate::api::auth::{AuthError, BearerAuth};
use crate::error::{ApiError, ErrorResponse, IdentityError};
use crate::identity::{IdentityStore, IdentitySummary, NewUser, RoleName};
use crate::token::{Claim, build_claims};
use axum::{
    Extension, Json,
    extract::rejection::JsonRejection,
    http::{StatusCode, header::LOCATION},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const ACCOUNT_TAG: &str = "Account";

/// Login credentials. Missing fields deserialize as empty and fail validation.
#[derive(Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Signed bearer token
    pub token: String,
    pub user: IdentitySummary,
    pub succeeded: bool,
}

/// Registration never hands out a token; clients log in afterwards.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub user: IdentitySummary,
    pub succeeded: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub claims: Vec<Claim>,
    pub issuer: String,
    /// Expiry as Unix seconds
    pub expires_at: i64,
}

/// Creates the account API router.
pub fn router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(register))
        .routes(routes!(me))
}

fn require(errors: &mut Vec<String>, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.push(format!("The {field} field is required."));
        return false;
    }
    true
}

/// Exactly one `@`, neither first nor last.
fn looks_like_email(value: &str) -> bool {
    let mut parts = value.split('@');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
    )
}

impl LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        require(&mut errors, "Username", &self.username);
        require(&mut errors, "Password", &self.password);
        into_result(errors)
    }
}

impl RegisterRequest {
    /// Validates every field, returning the parsed role on success.
    fn validate(&self) -> Result<RoleName, ApiError> {
        let mut errors = Vec::new();
        require(&mut errors, "FirstName", &self.first_name);
        require(&mut errors, "LastName", &self.last_name);
        if require(&mut errors, "Email", &self.email) && !looks_like_email(self.email.trim()) {
            errors.push("The Email field is not a valid e-mail address.".to_string());
        }
        require(&mut errors, "Password", &self.password);
        let role = if require(&mut errors, "Role", &self.role) {
            match RoleName::parse(&self.role) {
                Ok(role) => Some(role),
                Err(e) => {
                    errors.push(e.to_string());
                    None
                }
            }
        } else {
            None
        };
        into_result(errors)?;
        role.ok_or_else(|| ApiError::Validation("The Role field is required.".into()))
    }
}

fn into_result(errors: Vec<String>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors.join(", ")))
    }
}

fn accept<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/login",
    tag = ACCOUNT_TAG,
    operation_id = "Account Login",
    summary = "Log in with a user name and password",
    description = "Verifies the credentials against the identity store. On success returns a signed \
                   bearer token carrying the user's identity claims, together with the user summary.\n\n\
                   A failed login never reveals whether the user name or the password was wrong.",
    request_body(content = LoginRequest, description = "User credentials"),
    responses(
        (status = 200, description = "Credentials accepted", body = LoginResponse),
        (status = 400, description = "Invalid request body or credentials", body = ErrorResponse),
        (status = 500, description = "Identity store or signing failure", body = ErrorResponse)
    )
)]
async fn login(
    Extension(resources): Extension<AppResources>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let request = accept(payload)?;
    request.validate()?;

    let user = resources
        .identity
        .verify_credential(request.username.trim(), &request.password)
        .await
        .inspect_err(|e| {
            if matches!(e, IdentityError::InvalidCredentials) {
                tracing::info!("Login rejected");
            }
        })?;

    let issued = resources.tokens.issue(&build_claims(&user))?;
    tracing::info!(user_id = %user.id, expires_at = %issued.expires_at, "Token issued");

    Ok(Json(LoginResponse {
        token: issued.token,
        user,
        succeeded: true,
    }))
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    post,
    path = "/register",
    tag = ACCOUNT_TAG,
    operation_id = "Account Register",
    summary = "Register a new account",
    description = "Creates a user whose user name is the given email address, creates the requested \
                   role if it does not exist yet and assigns it to the user.\n\n\
                   **Note:** registration does not issue a token. Call `/login` afterwards.",
    request_body(content = RegisterRequest, description = "New account details"),
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid request body or user name already taken", body = ErrorResponse),
        (status = 500, description = "Identity store failure", body = ErrorResponse)
    )
)]
async fn register(
    Extension(resources): Extension<AppResources>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = accept(payload)?;
    let role = request.validate()?;
    let email = request.email.trim().to_string();

    let created = resources
        .identity
        .create_user(NewUser {
            user_name: email.clone(),
            email,
            first_name: request.first_name,
            last_name: request.last_name,
            password: request.password,
        })
        .await?;

    let role = match grant_role(resources.identity.as_ref(), &created.id, &role).await {
        Ok(stored) => stored,
        Err(e) => {
            // Do not leave a user behind without the role it registered for.
            match resources.identity.delete_user(&created.id).await {
                Ok(()) => tracing::warn!(user_id = %created.id, error = %e, "Role assignment failed, registration rolled back"),
                Err(rollback) => tracing::error!(
                    user_id = %created.id,
                    error = %e,
                    rollback_error = %rollback,
                    "Role assignment failed and rollback failed, user left without role"
                ),
            }
            return Err(e.into());
        }
    };

    tracing::info!(user_id = %created.id, role = %role, "User registered");

    let user = IdentitySummary { role, ..created };
    Ok((
        StatusCode::CREATED,
        [(LOCATION, "api/account/register")],
        Json(RegisterResponse {
            user,
            succeeded: true,
        }),
    ))
}

/// Returns the role name as stored, so an existing role keeps its original casing.
async fn grant_role(
    identity: &dyn IdentityStore,
    user_id: &str,
    role: &RoleName,
) -> Result<String, IdentityError> {
    identity.ensure_role(role).await?;
    identity.assign_role(user_id, role).await
}

#[tracing::instrument(skip_all)]
#[utoipa::path(
    get,
    path = "/me",
    tag = ACCOUNT_TAG,
    operation_id = "Account Me",
    summary = "Inspect the presented bearer token",
    description = "Validates the bearer token (signature, issuer, audience and expiry) and returns the \
                   identity claims it carries. No server-side state is consulted.",
    security(("Authorization" = [])),
    responses(
        (status = 200, description = "Token is valid", body = MeResponse),
        (status = 401, description = "Missing, invalid or expired token", body = AuthError,
            example = json!({"error": "invalid_token", "error_description": "Token has expired"}))
    )
)]
async fn me(BearerAuth(token): BearerAuth) -> Json<MeResponse> {
    Json(MeResponse {
        claims: token.claims,
        issuer: token.issuer,
        expires_at: token.expires_at.unix_timestamp(),
    })
}
