//! Creates the account tables backing the identity store.
//!
//! - account_user: registered users with their Argon2 password hash
//! - account_role: role names, unique by normalized (upper-case) name
//! - account_user_role: role membership

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccountUser::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccountUser::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccountUser::UserName).string().not_null())
                    .col(
                        ColumnDef::new(AccountUser::NormalizedUserName)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(AccountUser::Email).string().not_null())
                    .col(ColumnDef::new(AccountUser::FirstName).string().not_null())
                    .col(ColumnDef::new(AccountUser::LastName).string().not_null())
                    .col(
                        ColumnDef::new(AccountUser::PasswordHash)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccountUser::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccountRole::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccountRole::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccountRole::Name).string().not_null())
                    .col(
                        ColumnDef::new(AccountRole::NormalizedName)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccountUserRole::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AccountUserRole::UserId).string().not_null())
                    .col(ColumnDef::new(AccountUserRole::RoleId).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(AccountUserRole::UserId)
                            .col(AccountUserRole::RoleId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_user_role_user")
                            .from(AccountUserRole::Table, AccountUserRole::UserId)
                            .to(AccountUser::Table, AccountUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_user_role_role")
                            .from(AccountUserRole::Table, AccountUserRole::RoleId)
                            .to(AccountRole::Table, AccountRole::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccountUserRole::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccountRole::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccountUser::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum AccountUser {
    Table,
    Id,
    UserName,
    NormalizedUserName,
    Email,
    FirstName,
    LastName,
    PasswordHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AccountRole {
    Table,
    Id,
    Name,
    NormalizedName,
}

#[derive(DeriveIden)]
enum AccountUserRole {
    Table,
    UserId,
    RoleId,
}
