//! SeaORM entities for the account tables.

pub mod account_role;
pub mod account_user;
pub mod account_user_role;
