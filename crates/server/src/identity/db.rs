//! SeaORM-backed identity store.

use crate::entity::{account_role, account_user, account_user_role};
use crate::identity::password::{hash_password, verify_password};
use crate::identity::{
    IdentityError, IdentityStore, IdentitySummary, NewUser, RoleName, normalize_user_name,
    validate_user_name,
};
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, SqlErr,
};
use std::sync::Arc;
use time::OffsetDateTime;

/// Identity store persisting users and roles through SeaORM.
#[derive(Clone)]
pub struct DbIdentityStore {
    db: Arc<DatabaseConnection>,
}

impl DbIdentityStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find_user_by_name(
        &self,
        user_name: &str,
    ) -> Result<Option<account_user::Model>, DbErr> {
        account_user::Entity::find()
            .filter(account_user::Column::NormalizedUserName.eq(normalize_user_name(user_name)))
            .one(self.db.as_ref())
            .await
    }

    async fn find_role(&self, role: &RoleName) -> Result<Option<account_role::Model>, DbErr> {
        account_role::Entity::find()
            .filter(account_role::Column::NormalizedName.eq(role.normalized()))
            .one(self.db.as_ref())
            .await
    }

    /// Role names of `user_id`, sorted by name.
    pub async fn roles_of(&self, user_id: &str) -> Result<Vec<String>, IdentityError> {
        let roles = account_role::Entity::find()
            .join(JoinType::InnerJoin, account_role::Relation::UserRoles.def())
            .filter(account_user_role::Column::UserId.eq(user_id))
            .order_by_asc(account_role::Column::Name)
            .all(self.db.as_ref())
            .await?;
        Ok(roles.into_iter().map(|r| r.name).collect())
    }
}

fn summarize(user: account_user::Model, roles: &[String]) -> IdentitySummary {
    IdentitySummary {
        id: user.id,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
        user_name: user.user_name,
        role: roles.join(","),
    }
}

#[async_trait]
impl IdentityStore for DbIdentityStore {
    #[tracing::instrument(skip(self, password))]
    async fn verify_credential(
        &self,
        user_name: &str,
        password: &str,
    ) -> Result<IdentitySummary, IdentityError> {
        let Some(user) = self.find_user_by_name(user_name).await? else {
            tracing::debug!("Login attempt for unknown user");
            return Err(IdentityError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash) {
            tracing::debug!(user_id = %user.id, "Login attempt with wrong password");
            return Err(IdentityError::InvalidCredentials);
        }

        let roles = self.roles_of(&user.id).await?;
        Ok(summarize(user, &roles))
    }

    #[tracing::instrument(skip(self, user), fields(user_name = %user.user_name))]
    async fn create_user(&self, user: NewUser) -> Result<IdentitySummary, IdentityError> {
        validate_user_name(&user.user_name)?;

        if self.find_user_by_name(&user.user_name).await?.is_some() {
            return Err(IdentityError::DuplicateUserName(user.user_name));
        }

        let password_hash =
            hash_password(&user.password).map_err(|e| IdentityError::PasswordHash(e.to_string()))?;

        let model = account_user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            normalized_user_name: Set(normalize_user_name(&user.user_name)),
            user_name: Set(user.user_name.clone()),
            email: Set(user.email),
            first_name: Set(user.first_name),
            last_name: Set(user.last_name),
            password_hash: Set(password_hash),
            created_at: Set(OffsetDateTime::now_utc()),
        };

        // The existence check above races with concurrent registrations; the unique
        // index on normalized_user_name is the real guard.
        let created = match model.insert(self.db.as_ref()).await {
            Ok(created) => created,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(IdentityError::DuplicateUserName(user.user_name));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user_id = %created.id, "User created");
        Ok(summarize(created, &[]))
    }

    #[tracing::instrument(skip(self), fields(role = %role))]
    async fn ensure_role(&self, role: &RoleName) -> Result<bool, IdentityError> {
        let model = account_role::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(role.as_str().to_string()),
            normalized_name: Set(role.normalized()),
        };

        let inserted = account_role::Entity::insert(model)
            .on_conflict(
                OnConflict::column(account_role::Column::NormalizedName)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        let created = inserted > 0;
        if created {
            tracing::info!("Role created");
        }
        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(role = %role))]
    async fn assign_role(&self, user_id: &str, role: &RoleName) -> Result<String, IdentityError> {
        let role_model = self
            .find_role(role)
            .await?
            .ok_or_else(|| IdentityError::RoleNotFound(role.to_string()))?;

        if account_user::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
            .is_none()
        {
            return Err(IdentityError::UserNotFound(user_id.to_string()));
        }

        let membership = account_user_role::ActiveModel {
            user_id: Set(user_id.to_string()),
            role_id: Set(role_model.id.clone()),
        };
        account_user_role::Entity::insert(membership)
            .on_conflict(
                OnConflict::columns([
                    account_user_role::Column::UserId,
                    account_user_role::Column::RoleId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        Ok(role_model.name)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_user(&self, user_id: &str) -> Result<(), IdentityError> {
        account_user_role::Entity::delete_many()
            .filter(account_user_role::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await?;

        let result = account_user::Entity::delete_by_id(user_id)
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(IdentityError::UserNotFound(user_id.to_string()));
        }

        tracing::info!("User deleted");
        Ok(())
    }
}
