use config::{Config, ConfigError, File};
use sea_orm_migration::prelude::*;
use std::{env, process};

/// `database_url` from the given config file, if the file sets one.
fn database_url_from(path: &str) -> Result<Option<String>, ConfigError> {
    let settings = Config::builder()
        .add_source(File::with_name(path))
        .build()?;
    match settings.get_string("database_url") {
        Ok(url) => Ok(Some(url)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() {
    // DATABASE_URL from the environment wins over config.yaml
    if env::var("DATABASE_URL").is_err() {
        match database_url_from("config.yaml") {
            Ok(Some(url)) => env::set_var("DATABASE_URL", url),
            Ok(None) => {}
            Err(e) => {
                eprintln!("DATABASE_URL is not set and config.yaml could not be read: {e}");
                process::exit(1);
            }
        }
    }
    cli::run_cli(migration::Migrator).await;
}
