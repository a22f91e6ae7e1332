use crate::ml::RegressorKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Dataset locations
    #[serde(default)]
    pub data: DataConfig,

    /// Regression and classification training
    #[serde(default)]
    pub training: TrainingConfig,

    /// Time-series forecasting
    #[serde(default)]
    pub forecasting: ForecastingConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: FIREGUARD_)
            .add_source(
                config::Environment::with_prefix("FIREGUARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Range-check training and forecasting parameters
    pub fn validate(&self) -> crate::error::Result<()> {
        self.server.validate()?;
        self.training.validate()?;
        self.forecasting.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,

    /// Upper bound on a single inference call (milliseconds)
    #[serde(default = "default_inference_timeout")]
    #[validate(range(min = 1))]
    pub inference_timeout_ms: u64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_secs: default_request_timeout(),
            inference_timeout_ms: default_inference_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Raw incident CSV; only read when `prepare_on_start` is set
    pub raw_path: Option<PathBuf>,

    /// Cleaned table written by preparation
    #[serde(default = "default_prepared_path")]
    pub prepared_path: PathBuf,

    /// Encoded table the models are trained on
    #[serde(default = "default_encoded_path")]
    pub encoded_path: PathBuf,

    /// Run preparation from `raw_path` before training
    #[serde(default)]
    pub prepare_on_start: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_path: None,
            prepared_path: default_prepared_path(),
            encoded_path: default_encoded_path(),
            prepare_on_start: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrainingConfig {
    /// Seed for splits, forests and oversampling
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Held-out fraction
    #[serde(default = "default_test_size")]
    #[validate(range(min = 0.05, max = 0.5))]
    pub test_size: f64,

    /// Regressor served by `/predict-loss`
    #[serde(default = "default_production_regressor")]
    pub production_regressor: RegressorKind,

    /// Boosting rounds for both boosted regressors and the classifier
    #[serde(default = "default_n_estimators")]
    #[validate(range(min = 1, max = 5000))]
    pub n_estimators: usize,

    #[serde(default = "default_gb_learning_rate")]
    #[validate(range(min = 0.001, max = 1.0))]
    pub gradient_boosting_learning_rate: f64,

    #[serde(default = "default_gb_max_depth")]
    #[validate(range(min = 1, max = 32))]
    pub gradient_boosting_max_depth: u16,

    #[serde(default = "default_bt_learning_rate")]
    #[validate(range(min = 0.001, max = 1.0))]
    pub boosted_trees_learning_rate: f64,

    #[serde(default = "default_bt_max_depth")]
    #[validate(range(min = 1, max = 32))]
    pub boosted_trees_max_depth: u16,

    #[serde(default = "default_forest_trees")]
    #[validate(range(min = 1, max = 5000))]
    pub random_forest_trees: usize,

    /// SMOTE neighbourhood size
    #[serde(default = "default_smote_k")]
    #[validate(range(min = 1, max = 50))]
    pub smote_k_neighbors: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            test_size: default_test_size(),
            production_regressor: default_production_regressor(),
            n_estimators: default_n_estimators(),
            gradient_boosting_learning_rate: default_gb_learning_rate(),
            gradient_boosting_max_depth: default_gb_max_depth(),
            boosted_trees_learning_rate: default_bt_learning_rate(),
            boosted_trees_max_depth: default_bt_max_depth(),
            random_forest_trees: default_forest_trees(),
            smote_k_neighbors: default_smote_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForecastingConfig {
    /// LSTM hidden units
    #[serde(default = "default_lstm_units")]
    #[validate(range(min = 1, max = 1024))]
    pub lstm_units: usize,

    #[serde(default = "default_lstm_epochs")]
    #[validate(range(min = 1, max = 10000))]
    pub lstm_epochs: usize,

    #[serde(default = "default_lstm_batch_size")]
    #[validate(range(min = 1))]
    pub lstm_batch_size: usize,

    #[serde(default = "default_lstm_learning_rate")]
    #[validate(range(min = 0.000001, max = 1.0))]
    pub lstm_learning_rate: f64,

    /// Seed for LSTM weight initialisation and batch shuffling
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Decimal places on forecast responses
    #[serde(default = "default_round_decimals")]
    #[validate(range(max = 10))]
    pub round_decimals: u32,

    /// Forecasts above this multiple of the historical monthly max are flagged
    #[serde(default = "default_sanity_factor")]
    #[validate(range(min = 1.0))]
    pub sanity_factor: f64,
}

impl Default for ForecastingConfig {
    fn default() -> Self {
        Self {
            lstm_units: default_lstm_units(),
            lstm_epochs: default_lstm_epochs(),
            lstm_batch_size: default_lstm_batch_size(),
            lstm_learning_rate: default_lstm_learning_rate(),
            seed: default_seed(),
            round_decimals: default_round_decimals(),
            sanity_factor: default_sanity_factor(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
            prometheus_enabled: default_true(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_inference_timeout() -> u64 {
    5000
}

fn default_prepared_path() -> PathBuf {
    PathBuf::from("data/prepared_wildfire_data.csv")
}

fn default_encoded_path() -> PathBuf {
    PathBuf::from("data/encoded_wildfire_data.csv")
}

fn default_seed() -> u64 {
    42
}

fn default_test_size() -> f64 {
    0.2
}

fn default_production_regressor() -> RegressorKind {
    RegressorKind::GradientBoosting
}

fn default_n_estimators() -> usize {
    100
}

fn default_gb_learning_rate() -> f64 {
    0.1
}

fn default_gb_max_depth() -> u16 {
    3
}

fn default_bt_learning_rate() -> f64 {
    0.3
}

fn default_bt_max_depth() -> u16 {
    6
}

fn default_forest_trees() -> usize {
    100
}

fn default_smote_k() -> usize {
    5
}

fn default_lstm_units() -> usize {
    50
}

fn default_lstm_epochs() -> usize {
    50
}

fn default_lstm_batch_size() -> usize {
    32
}

fn default_lstm_learning_rate() -> f64 {
    0.001
}

fn default_round_decimals() -> u32 {
    2
}

fn default_sanity_factor() -> f64 {
    10.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "fireguard".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_http_port(), 8000);
        assert_eq!(default_seed(), 42);
        assert_eq!(default_log_level(), "info");
        assert!(default_true());
    }

    #[test]
    fn test_training_defaults() {
        let training = TrainingConfig::default();
        assert_eq!(training.production_regressor, RegressorKind::GradientBoosting);
        assert_eq!(training.n_estimators, 100);
        assert_eq!(training.test_size, 0.2);
        assert_eq!(training.smote_k_neighbors, 5);
        assert!(training.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let training = TrainingConfig {
            test_size: 0.9,
            ..TrainingConfig::default()
        };
        assert!(training.validate().is_err());

        let forecasting = ForecastingConfig {
            sanity_factor: 0.5,
            ..ForecastingConfig::default()
        };
        assert!(forecasting.validate().is_err());
    }

    #[test]
    fn test_embedded_defaults_parse() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.http_port, 8000);
        assert_eq!(config.forecasting.round_decimals, 2);
        assert_eq!(config.forecasting.lstm_units, 50);
        assert_eq!(config.observability.service_name, "fireguard");
        assert_eq!(config.training.production_regressor, RegressorKind::GradientBoosting);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeouts_as_durations() {
        let server = ServerConfig::default();
        assert_eq!(server.request_timeout(), Duration::from_secs(30));
        assert_eq!(server.inference_timeout(), Duration::from_millis(5000));
    }
}
