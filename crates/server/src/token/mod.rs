//! Bearer token issuance.
//!
//! - `claims` - maps a verified [`IdentitySummary`](crate::identity::IdentitySummary) to the
//!   fixed claim set carried by every token
//! - `signer` - signs claims into an expiring HS256 JWT and validates tokens statelessly

pub mod claims;
pub mod signer;

pub use crate::error::TokenError;
pub use claims::{Claim, build_claims};
pub use signer::{IssuedToken, TokenService, ValidatedToken};
