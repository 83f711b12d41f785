//! Account gateway: user registration, password login and signed bearer token issuance.
//!
//! Credential checks and role membership are delegated to an [`identity::IdentityStore`];
//! this crate turns a verified identity into a claim set and signs it.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::identity::IdentityStore;
use crate::token::TokenService;

pub mod api;
pub mod config;
pub mod entity;
pub mod error;
pub mod identity;
pub mod token;

/// Process-wide, read-only resources shared by every request.
#[derive(Clone)]
pub struct AppResources {
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenService>,
    pub identity: Arc<dyn IdentityStore>,
}
