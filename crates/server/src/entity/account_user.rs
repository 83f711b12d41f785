//! Account user entity - registered users and their password hashes.

use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "account_user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_name: String,
    /// Upper-cased `user_name`, used for case-insensitive lookups.
    #[sea_orm(unique)]
    pub normalized_user_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::account_user_role::Entity")]
    UserRoles,
}

impl Related<super::account_user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRoles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
