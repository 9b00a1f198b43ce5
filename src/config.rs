use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 3000;
const CONFIG_DIR: &str = "config";
const DEFAULT_PRICE_SERVICE_URL: &str = "https://api.coingecko.com/api/v3";
const DEFAULT_RATE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SIMULATION_TIMEOUT_SECS: u64 = 300;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Database connection URL for the order store
    pub database_url: String,

    /// Directory with the storefront pages, served for unmatched routes
    #[serde(default)]
    pub static_dir: Option<String>,

    /// GST rate applied to the cart subtotal (as decimal, e.g. 0.18)
    #[serde(default = "default_gst_rate")]
    #[validate(custom = "validate_tax_rate")]
    pub gst_rate: Decimal,

    /// VAT rate applied to the cart subtotal (as decimal, e.g. 0.05)
    #[serde(default = "default_vat_rate")]
    #[validate(custom = "validate_tax_rate")]
    pub vat_rate: Decimal,

    /// Fiat currency code understood by the price service (e.g. "inr")
    #[serde(default = "default_fiat_currency")]
    #[validate(length(min = 1))]
    pub fiat_currency: String,

    /// Asset id understood by the price service (e.g. "ethereum")
    #[serde(default = "default_crypto_asset")]
    #[validate(length(min = 1))]
    pub crypto_asset: String,

    /// Ticker shown next to crypto amounts (e.g. "ETH")
    #[serde(default = "default_crypto_symbol")]
    pub crypto_symbol: String,

    /// Base URL of the price service
    #[serde(default = "default_price_service_url")]
    pub price_service_url: String,

    /// Timeout for a single rate lookup (seconds)
    #[serde(default = "default_rate_timeout_secs")]
    #[validate(range(min = 1, max = 60))]
    pub rate_timeout_secs: u64,

    /// Program that runs the payment simulation
    #[serde(default = "default_simulator_program")]
    #[validate(length(min = 1))]
    pub simulator_program: String,

    /// Leading arguments passed before the amount and credential
    #[serde(default = "default_simulator_args")]
    pub simulator_args: Vec<String>,

    /// Upper bound on a simulation run (seconds), 0 = wait indefinitely
    #[serde(default = "default_simulation_timeout_secs")]
    pub simulation_timeout_secs: u64,

    /// Checkout sessions untouched this long (seconds) are evicted
    #[serde(default = "default_session_idle_secs")]
    #[validate(range(min = 1))]
    pub session_idle_secs: u64,

    /// Capacity of the internal event channel
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,
}

impl AppConfig {
    /// Creates a new AppConfig with default settings for the given connection
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            database_url,
            static_dir: None,
            gst_rate: default_gst_rate(),
            vat_rate: default_vat_rate(),
            fiat_currency: default_fiat_currency(),
            crypto_asset: default_crypto_asset(),
            crypto_symbol: default_crypto_symbol(),
            price_service_url: default_price_service_url(),
            rate_timeout_secs: default_rate_timeout_secs(),
            simulator_program: default_simulator_program(),
            simulator_args: default_simulator_args(),
            simulation_timeout_secs: default_simulation_timeout_secs(),
            session_idle_secs: default_session_idle_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn rate_timeout(&self) -> Duration {
        Duration::from_secs(self.rate_timeout_secs)
    }

    /// Simulation bound, `None` when disabled
    pub fn simulation_timeout(&self) -> Option<Duration> {
        match self.simulation_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    /// How often idle sessions are swept, a tenth of the TTL but at least a second
    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs((self.session_idle_secs / 10).max(1))
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_gst_rate() -> Decimal {
    Decimal::new(18, 2)
}

fn default_vat_rate() -> Decimal {
    Decimal::new(5, 2)
}

fn default_fiat_currency() -> String {
    "inr".to_string()
}

fn default_crypto_asset() -> String {
    "ethereum".to_string()
}

fn default_crypto_symbol() -> String {
    "ETH".to_string()
}

fn default_price_service_url() -> String {
    DEFAULT_PRICE_SERVICE_URL.to_string()
}

fn default_rate_timeout_secs() -> u64 {
    DEFAULT_RATE_TIMEOUT_SECS
}

fn default_simulator_program() -> String {
    "python".to_string()
}

fn default_simulator_args() -> Vec<String> {
    vec!["backend/simulation.py".to_string()]
}

fn default_simulation_timeout_secs() -> u64 {
    DEFAULT_SIMULATION_TIMEOUT_SECS
}

fn default_session_idle_secs() -> u64 {
    DEFAULT_SESSION_IDLE_SECS
}

fn default_event_channel_capacity() -> usize {
    1024
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_tax_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if rate.is_sign_negative() || *rate > Decimal::ONE {
        let mut err = ValidationError::new("tax_rate");
        err.message = Some("tax rates must be between 0.0 and 1.0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("cakeshop_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());

    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://cakeshop.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .list_separator(" ")
                .with_list_parse_key("simulator_args")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
