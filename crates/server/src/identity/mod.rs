//! Identity store capability.
//!
//! Handlers depend only on the [`IdentityStore`] trait: credential verification, user
//! creation and role membership are all delegated to it. [`DbIdentityStore`] is the
//! SeaORM-backed implementation used by the server.

pub mod db;
pub mod password;

pub use crate::error::IdentityError;
pub use db::DbIdentityStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Longest accepted role name.
pub const MAX_ROLE_NAME_LEN: usize = 256;

/// Characters a user name may contain. Emails fit, since user names default to them.
const ALLOWED_USER_NAME_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-._@+";

/// The verified view of a user returned to clients and fed into token claims.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySummary {
    /// Opaque user identifier
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub user_name: String,
    /// Comma-joined role names, sorted
    pub role: String,
}

/// Fields needed to create a user. The password is plaintext and only lives until hashed.
#[derive(Clone)]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("user_name", &self.user_name)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A validated role name.
///
/// Roles are joined with commas in summaries and tokens, so a name may not contain one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoleName(String);

impl RoleName {
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(IdentityError::InvalidRoleName(
                "Role name cannot be empty.".into(),
            ));
        }
        if name.chars().count() > MAX_ROLE_NAME_LEN {
            return Err(IdentityError::InvalidRoleName(format!(
                "Role name cannot be longer than {MAX_ROLE_NAME_LEN} characters."
            )));
        }
        if name.contains(',') {
            return Err(IdentityError::InvalidRoleName(format!(
                "Role name '{name}' is invalid, it cannot contain ','."
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive key under which the role is stored.
    pub fn normalized(&self) -> String {
        self.0.to_uppercase()
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reject user names that are empty or contain characters outside the allowed set.
pub fn validate_user_name(user_name: &str) -> Result<(), IdentityError> {
    if user_name.is_empty() || !user_name.chars().all(|c| ALLOWED_USER_NAME_CHARS.contains(c)) {
        return Err(IdentityError::InvalidUserName(user_name.to_string()));
    }
    Ok(())
}

/// Upper-cased form used for unique, case-insensitive user name lookups.
pub fn normalize_user_name(user_name: &str) -> String {
    user_name.to_uppercase()
}

/// External subsystem of record for accounts, passwords and role membership.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Check a user name / password pair and return the user with its joined roles.
    ///
    /// Unknown users and wrong passwords both yield [`IdentityError::InvalidCredentials`].
    async fn verify_credential(
        &self,
        user_name: &str,
        password: &str,
    ) -> Result<IdentitySummary, IdentityError>;

    /// Create a user. The returned summary has no roles yet.
    async fn create_user(&self, user: NewUser) -> Result<IdentitySummary, IdentityError>;

    /// Create `role` if it does not exist yet. Returns whether this call created it.
    ///
    /// Must be a single atomic upsert so concurrent callers never create duplicates.
    async fn ensure_role(&self, role: &RoleName) -> Result<bool, IdentityError>;

    /// Add `user_id` to an existing role. Assigning a role twice is a no-op.
    ///
    /// Returns the role name as stored, which may differ in case from `role`.
    async fn assign_role(&self, user_id: &str, role: &RoleName) -> Result<String, IdentityError>;

    /// Remove a user and its role memberships. Used to roll back a failed registration.
    async fn delete_user(&self, user_id: &str) -> Result<(), IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_name_is_trimmed() {
        let role = RoleName::parse("  Surveyor ").unwrap();
        assert_eq!(role.as_str(), "Surveyor");
        assert_eq!(role.normalized(), "SURVEYOR");
        assert_eq!(role.to_string(), "Surveyor");
    }

    #[test]
    fn role_name_rejects_empty_comma_and_overlong() {
        assert!(RoleName::parse("").is_err());
        assert!(RoleName::parse("   ").is_err());
        assert!(RoleName::parse("Admin,Root").is_err());
        assert!(RoleName::parse(&"r".repeat(MAX_ROLE_NAME_LEN + 1)).is_err());
        assert!(RoleName::parse(&"r".repeat(MAX_ROLE_NAME_LEN)).is_ok());
    }

    #[test]
    fn user_name_charset() {
        assert!(validate_user_name("ada.lovelace+test@example.org").is_ok());
        assert!(validate_user_name("plain_user-1").is_ok());
        assert!(validate_user_name("").is_err());
        assert!(validate_user_name("has space@example.org").is_err());
        assert!(validate_user_name("semi;colon").is_err());
    }

    #[test]
    fn new_user_debug_hides_password() {
        let user = NewUser {
            user_name: "a@b.c".into(),
            email: "a@b.c".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            password: "hunter2".into(),
        };
        let printed = format!("{user:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn summary_serializes_camel_case() {
        let summary = IdentitySummary {
            id: "1".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.org".into(),
            user_name: "ada@example.org".into(),
            role: "Admin".into(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["lastName"], "Lovelace");
        assert_eq!(json["userName"], "ada@example.org");
        assert_eq!(json["role"], "Admin");
    }
}
