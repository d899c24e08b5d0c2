//! Service configuration
//!
//! Values come from `LENDING_*` environment variables on top of the defaults
//! below. Nested scoring keys use a double underscore, for example
//! `LENDING_SCORING__SEVERE_LATE_DAYS=45`.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment};
use serde::Deserialize;

use core_kernel::{Currency, Timezone};
use domain_client::ScoringPolicy;
use infra_db::DatabaseConfig;

pub const ENV_PREFIX: &str = "LENDING";

/// Log output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Lending core configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LendingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub log_level: String,
    pub log_format: LogFormat,
    /// PostgreSQL URL for the funds ledger; in-memory adapters when absent
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Currency of the company funds ledger
    pub currency: Currency,
    /// Zone used for monthly report buckets
    pub business_timezone: Timezone,
    pub scoring: ScoringPolicy,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            db_max_connections: 10,
            currency: Currency::KES,
            business_timezone: Timezone::default(),
            scoring: ScoringPolicy::default(),
        }
    }
}

impl LendingConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_builder(config::Config::builder())
    }

    /// Layers the environment over an existing builder
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Pool settings, if a database is configured
    pub fn database(&self) -> Option<DatabaseConfig> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| DatabaseConfig::new(url).max_connections(self.db_max_connections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LendingConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.currency, Currency::KES);
        assert_eq!(config.db_max_connections, 10);
        assert!(config.database().is_none());
    }

    #[test]
    fn test_overrides() {
        let builder = config::Config::builder()
            .set_override("log_format", "json")
            .unwrap()
            .set_override("currency", "UGX")
            .unwrap()
            .set_override("database_url", "postgres://localhost/lending")
            .unwrap()
            .set_override("db_max_connections", 4)
            .unwrap()
            .set_override("scoring.severe_late_days", 45)
            .unwrap();

        let config: LendingConfig = builder.build().unwrap().try_deserialize().unwrap();

        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.currency, Currency::UGX);
        assert_eq!(config.scoring.severe_late_days, 45);
        assert_eq!(config.scoring.moderate_late_days, ScoringPolicy::default().moderate_late_days);
        assert_eq!(config.database().unwrap().max_connections, 4);
    }

    #[test]
    fn test_blank_database_url_means_in_memory() {
        let config = LendingConfig {
            database_url: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.database().is_none());
    }
}
