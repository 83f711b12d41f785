//! Identity claims embedded in issued tokens.

use crate::identity::IdentitySummary;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const EMAIL: &str = "Email";
pub const FIRST_NAME: &str = "FirstName";
pub const LAST_NAME: &str = "LastName";
/// Subject identifier, carries the user id.
pub const NAME_IDENTIFIER: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";
/// Principal name, also carries the user id.
pub const NAME: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name";
pub const ROLE: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";

/// A named attribute asserted about the token subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claim {
    pub name: String,
    pub value: String,
}

impl Claim {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Build the six identity claims for `user`, always in the same order.
pub fn build_claims(user: &IdentitySummary) -> Vec<Claim> {
    vec![
        Claim::new(EMAIL, &user.email),
        Claim::new(FIRST_NAME, &user.first_name),
        Claim::new(LAST_NAME, &user.last_name),
        Claim::new(NAME_IDENTIFIER, &user.id),
        Claim::new(NAME, &user.id),
        Claim::new(ROLE, &user.role),
    ]
}

/// First value of the claim called `name`, if present.
pub fn find<'a>(claims: &'a [Claim], name: &str) -> Option<&'a str> {
    claims
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.value.as_str())
}
