use account_gateway::AppResources;
use account_gateway::api::start_webserver;
use account_gateway::config::load_config;
use account_gateway::identity::DbIdentityStore;
use account_gateway::token::TokenService;
use sea_orm::Database;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "account_gateway=info,tower_http=info,sea_orm=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let layer = fmt::layer().with_target(true).with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    initialize_tracing();

    // Configuration problems are fatal here, never per request.
    let config = Arc::new(load_config()?);
    let tokens = Arc::new(TokenService::new(&config.jwt)?);
    tracing::info!(
        issuer = %tokens.issuer(),
        lifetime_hours = tokens.lifetime().whole_hours(),
        "token signing configured"
    );

    let db = Arc::new(Database::connect(&config.database_url).await?);
    let identity = Arc::new(DbIdentityStore::new(db));

    let resources = AppResources {
        config,
        tokens,
        identity,
    };

    start_webserver(resources).await?;
    Ok(())
}
