//! Shared fixtures for integration tests.
#![allow(dead_code)]

use account_gateway::{
    AppResources,
    config::{AppConfig, JwtSettings},
    identity::DbIdentityStore,
    token::TokenService,
};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};
use std::sync::Arc;

pub const TEST_ISSUER: &str = "https://accounts.test.example.org";
pub const TEST_KEY: &str = "0123456789abcdef0123456789abcdef";

/// Create an in-memory database with the account tables.
pub async fn create_account_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.expect("connect");

    db.execute(Statement::from_string(
        DbBackend::Sqlite,
        r#"CREATE TABLE account_user (
            id TEXT PRIMARY KEY,
            user_name TEXT NOT NULL,
            normalized_user_name TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );"#,
    ))
    .await
    .expect("create account_user table");

    db.execute(Statement::from_string(
        DbBackend::Sqlite,
        r#"CREATE TABLE account_role (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            normalized_name TEXT NOT NULL UNIQUE
        );"#,
    ))
    .await
    .expect("create account_role table");

    db.execute(Statement::from_string(
        DbBackend::Sqlite,
        r#"CREATE TABLE account_user_role (
            user_id TEXT NOT NULL,
            role_id TEXT NOT NULL,
            PRIMARY KEY (user_id, role_id)
        );"#,
    ))
    .await
    .expect("create account_user_role table");

    db
}

pub fn create_test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        listen_addr: "127.0.0.1:0".into(),
        jwt: JwtSettings {
            key: TEST_KEY.into(),
            issuer: TEST_ISSUER.into(),
            expire_days: "7".into(),
        },
    }
}

pub async fn create_test_resources() -> (AppResources, Arc<DatabaseConnection>) {
    let db = Arc::new(create_account_test_db().await);
    let config = Arc::new(create_test_config());
    let tokens = Arc::new(TokenService::new(&config.jwt).expect("token service"));

    let resources = AppResources {
        config,
        tokens,
        identity: Arc::new(DbIdentityStore::new(db.clone())),
    };
    (resources, db)
}

/// Number of rows in `table`.
pub async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let row = db
        .query_one(Statement::from_string(
            DbBackend::Sqlite,
            format!("SELECT COUNT(*) AS n FROM {table};"),
        ))
        .await
        .expect("count query")
        .expect("count row");
    row.try_get("", "n").expect("count column")
}
