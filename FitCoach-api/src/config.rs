//! Process configuration read from the environment.

use std::env;

use thiserror::Error;
use tracing::info;

use fit_coach_data::database::{DatabaseConfig, DatabaseError};
use fit_coach_domain::auth::token::{SecurityError, TokenConfig};

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid PORT '{0}'")]
    Port(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Security(#[from] SecurityError),
}

/// Everything the server needs to start
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// `APP_ENV`, `development` unless set
    pub environment: String,
    pub database: DatabaseConfig,
    pub tokens: TokenConfig,
    pub stripe_api_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    /// Price used when a subscribe request names none
    pub stripe_price_id: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::Port(value))?,
            Err(_) => DEFAULT_PORT,
        };
        let environment = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Self {
            port,
            environment,
            database: DatabaseConfig::from_env()?,
            tokens: TokenConfig::from_env()?,
            stripe_api_key: optional("STRIPE_API_KEY"),
            stripe_webhook_secret: optional("STRIPE_WEBHOOK_SECRET"),
            stripe_price_id: optional("STRIPE_PRICE_ID"),
        };

        info!(
            "Configuration loaded: env={}, port={}, billing={}",
            config.environment,
            config.port,
            if config.stripe_api_key.is_some() { "configured" } else { "disabled" }
        );
        Ok(config)
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
