use thiserror::Error;

/// Result type for forecasting operations
pub type ForecastResult<T> = std::result::Result<T, ForecastError>;

/// Error type for forecasting operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("insufficient history: need at least {required} monthly points, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("forecast model error: {0}")]
    Model(String),
}
