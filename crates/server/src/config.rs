use serde::Deserialize;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Token signing settings.
///
/// `issuer` is written into both the `iss` and the `aud` claim.
#[derive(Clone, Debug, Deserialize)]
pub struct JwtSettings {
    pub key: String,
    pub issuer: String,
    /// Token lifetime in days, kept as a string and parsed when the signer is built.
    pub expire_days: String,
}

impl JwtSettings {
    /// Parse `expire_days`. Fractional values are accepted, zero and negatives are not.
    pub fn expire_days(&self) -> Result<f64, ConfigError> {
        let days: f64 = self.expire_days.trim().parse().map_err(|e| {
            ConfigError::Validation(format!(
                "jwt.expire_days must be a number, got '{}': {e}",
                self.expire_days
            ))
        })?;
        if !days.is_finite() || days <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "jwt.expire_days must be a positive number, got '{}'",
                self.expire_days
            )));
        }
        Ok(days)
    }

    /// Token lifetime as a duration. At least one second, and small enough that
    /// an expiry computed from the current time stays representable.
    pub fn lifetime(&self) -> Result<Duration, ConfigError> {
        let days = self.expire_days()?;
        let out_of_range = || {
            ConfigError::Validation(format!(
                "jwt.expire_days must be between one second and the largest representable date, got '{}'",
                self.expire_days
            ))
        };
        let lifetime = Duration::checked_seconds_f64(days * 86_400.0)
            .filter(|lifetime| *lifetime >= Duration::SECOND)
            .ok_or_else(out_of_range)?;
        OffsetDateTime::now_utc()
            .checked_add(lifetime)
            .ok_or_else(out_of_range)?;
        Ok(lifetime)
    }
}

#[derive(Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub jwt: JwtSettings,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl AppConfig {
    /// Checks everything that must hold before the server may start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Validation("database_url must be set".into()));
        }
        if self.jwt.key.is_empty() {
            return Err(ConfigError::Validation("jwt.key must be set".into()));
        }
        if self.jwt.issuer.trim().is_empty() {
            return Err(ConfigError::Validation("jwt.issuer must be set".into()));
        }
        self.jwt.lifetime()?;
        Ok(())
    }
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Any variable matching the key path separated by double underscores
/// (e.g. `JWT__KEY`) overrides the file value.
///
/// Returns a `ConfigError` instead of panicking so the caller can decide how to fail.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml"))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Convenience helper for binaries that treat bad configuration as fatal.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}
