//! Configuration management
//!
//! This module handles loading and parsing configuration for the storefront.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Secret material for signing cookies
    #[serde(default)]
    pub security: SecurityConfig,
    /// Session cookie configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Payment gateway configuration
    #[serde(default)]
    pub payment: PaymentConfig,
    /// Template configuration
    #[serde(default)]
    pub theme: ThemeConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/storefront.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Security configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Key used to sign session cookies.
    ///
    /// When unset a random key is generated at startup, which invalidates
    /// every session on restart.
    #[serde(default)]
    pub secret_key: Option<String>,
}

impl SecurityConfig {
    /// Return the configured secret key, or a freshly generated one
    pub fn effective_secret_key(&self) -> String {
        match self.secret_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key.to_string(),
            _ => {
                tracing::warn!(
                    "No security.secret_key configured, generating a random key; sessions will not survive a restart"
                );
                let mut bytes = [0u8; 32];
                OsRng.fill_bytes(&mut bytes);
                data_encoding::HEXLOWER.encode(&bytes)
            }
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Session lifetime in hours
    #[serde(default = "default_session_ttl_hours")]
    pub ttl_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_hours: default_session_ttl_hours(),
        }
    }
}

fn default_cookie_name() -> String {
    "session".to_string()
}

/// Longest accepted session lifetime (ten years)
pub const MAX_SESSION_TTL_HOURS: i64 = 87_600;

fn default_session_ttl_hours() -> i64 {
    7 * 24
}

/// Payment gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Checkout endpoint of the gateway
    #[serde(default = "default_payment_api_url")]
    pub api_url: String,
    /// Merchant identifier issued by the gateway
    #[serde(default)]
    pub merchant_id: String,
    /// Merchant secret used to sign checkout requests
    #[serde(default)]
    pub secret_key: String,
    /// ISO 4217 currency code sent with every checkout
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Request timeout for gateway calls
    #[serde(default = "default_payment_timeout")]
    pub timeout_seconds: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            api_url: default_payment_api_url(),
            merchant_id: String::new(),
            secret_key: String::new(),
            currency: default_currency(),
            timeout_seconds: default_payment_timeout(),
        }
    }
}

fn default_payment_api_url() -> String {
    "https://pay.fondy.eu/api/checkout/url/".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_payment_timeout() -> u64 {
    10
}

/// Template configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Directory with template overrides; embedded templates are used otherwise
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid value for {field} in '{path}': {message}")]
    InvalidValue {
        path: String,
        field: &'static str,
        message: String,
    },
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        config.validate(path)?;
        Ok(config)
    }

    /// Reject values that parse but cannot work at runtime
    fn validate(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let ttl = self.session.ttl_hours;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&ttl) {
            return Err(ConfigError::InvalidValue {
                path: path.display().to_string(),
                field: "session.ttl_hours",
                message: format!("{} is not between 1 and {}", ttl, MAX_SESSION_TTL_HOURS),
            });
        }
        Ok(())
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - STOREFRONT_SERVER_HOST
    /// - STOREFRONT_SERVER_PORT
    /// - STOREFRONT_DATABASE_DRIVER
    /// - STOREFRONT_DATABASE_URL
    /// - STOREFRONT_SECRET_KEY
    /// - STOREFRONT_SESSION_COOKIE_NAME
    /// - STOREFRONT_SESSION_TTL_HOURS
    /// - STOREFRONT_PAYMENT_API_URL
    /// - STOREFRONT_PAYMENT_MERCHANT_ID
    /// - STOREFRONT_PAYMENT_SECRET_KEY
    /// - STOREFRONT_PAYMENT_CURRENCY
    /// - STOREFRONT_PAYMENT_TIMEOUT_SECONDS
    /// - STOREFRONT_THEME_PATH
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("STOREFRONT_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("STOREFRONT_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        // Database configuration
        if let Ok(driver) = std::env::var("STOREFRONT_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("STOREFRONT_DATABASE_URL") {
            self.database.url = url;
        }

        // Security and session configuration
        if let Ok(key) = std::env::var("STOREFRONT_SECRET_KEY") {
            self.security.secret_key = Some(key);
        }
        if let Ok(name) = std::env::var("STOREFRONT_SESSION_COOKIE_NAME") {
            if !name.trim().is_empty() {
                self.session.cookie_name = name;
            }
        }
        if let Ok(ttl) = std::env::var("STOREFRONT_SESSION_TTL_HOURS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                if (1..=MAX_SESSION_TTL_HOURS).contains(&ttl) {
                    self.session.ttl_hours = ttl;
                }
            }
        }

        // Payment configuration
        if let Ok(url) = std::env::var("STOREFRONT_PAYMENT_API_URL") {
            self.payment.api_url = url;
        }
        if let Ok(merchant_id) = std::env::var("STOREFRONT_PAYMENT_MERCHANT_ID") {
            self.payment.merchant_id = merchant_id;
        }
        if let Ok(secret) = std::env::var("STOREFRONT_PAYMENT_SECRET_KEY") {
            self.payment.secret_key = secret;
        }
        if let Ok(currency) = std::env::var("STOREFRONT_PAYMENT_CURRENCY") {
            self.payment.currency = currency.to_uppercase();
        }
        if let Ok(timeout) = std::env::var("STOREFRONT_PAYMENT_TIMEOUT_SECONDS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.payment.timeout_seconds = timeout;
            }
        }

        // Theme configuration
        if let Ok(path) = std::env::var("STOREFRONT_THEME_PATH") {
            self.theme.path = Some(PathBuf::from(path));
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_VARS: &[&str] = &[
    "STOREFRONT_SERVER_HOST",
    "STOREFRONT_SERVER_PORT",
    "STOREFRONT_DATABASE_DRIVER",
    "STOREFRONT_DATABASE_URL",
    "STOREFRONT_SECRET_KEY",
    "STOREFRONT_SESSION_COOKIE_NAME",
    "STOREFRONT_SESSION_TTL_HOURS",
    "STOREFRONT_PAYMENT_API_URL",
    "STOREFRONT_PAYMENT_MERCHANT_ID",
    "STOREFRONT_PAYMENT_SECRET_KEY",
    "STOREFRONT_PAYMENT_CURRENCY",
    "STOREFRONT_PAYMENT_TIMEOUT_SECONDS",
    "STOREFRONT_THEME_PATH",
];


/// Property-based tests for configuration parsing
#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_host_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u8..=255, 0u8..=255, 0u8..=255, 0u8..=255)
                .prop_map(|(a, b, c, d)| format!("{}.{}.{}.{}", a, b, c, d)),
            Just("localhost".to_string()),
            "[a-z][a-z0-9]{0,10}".prop_map(|s| s),
        ]
    }

    fn valid_config_strategy() -> impl Strategy<Value = Config> {
        (
            valid_host_strategy(),
            1u16..=65535,
            prop_oneof![Just(DatabaseDriver::Sqlite), Just(DatabaseDriver::Mysql)],
            "[a-z][a-z0-9_/]{0,20}\\.db",
            prop::option::of("[a-zA-Z0-9]{8,32}"),
            1i64..=720,
            prop_oneof![Just("USD".to_string()), Just("EUR".to_string()), Just("RUB".to_string())],
        )
            .prop_map(|(host, port, driver, url, secret_key, ttl_hours, currency)| Config {
                server: ServerConfig { host, port },
                database: DatabaseConfig { driver, url },
                security: SecurityConfig { secret_key },
                session: SessionConfig {
                    cookie_name: "session".to_string(),
                    ttl_hours,
                },
                payment: PaymentConfig {
                    currency,
                    ..PaymentConfig::default()
                },
                theme: ThemeConfig::default(),
            })
    }

    fn malformed_yaml_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("server:\n  port: not_a_number".to_string()),
            Just("server:\n  port: \"8080\"".to_string()),
            Just("server:\n  port: 99999999999999999999".to_string()),
            Just("database:\n  driver: postgres".to_string()),
            Just("session:\n  ttl_hours: many".to_string()),
            Just("payment:\n  timeout_seconds: -1".to_string()),
            Just("server: [invalid, list]".to_string()),
            Just("database: \"just_a_string\"".to_string()),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn config_roundtrips_through_yaml(config in valid_config_strategy()) {
            let yaml = serde_yaml::to_string(&config).expect("Failed to serialize config");

            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "{}", yaml).expect("Failed to write config");

            let parsed = Config::load(file.path()).expect("Failed to parse config");

            prop_assert_eq!(config, parsed);
        }

        #[test]
        fn malformed_config_is_rejected(yaml in malformed_yaml_strategy()) {
            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "{}", yaml).expect("Failed to write config");

            prop_assert!(Config::load(file.path()).is_err());
        }
    }
}
