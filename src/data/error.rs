//! Error types for data preparation and loading

use thiserror::Error;

/// Result type for data operations
pub type DataResult<T> = std::result::Result<T, DataError>;

/// Errors raised while reading, cleaning or encoding incident tables
#[derive(Debug, Error)]
pub enum DataError {
    /// One or more required columns are absent from the header
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A date cell could not be parsed day-first
    #[error("row {row}: cannot parse {column} value '{value}' as a day-first date")]
    InvalidDate {
        row: usize,
        column: String,
        value: String,
    },

    /// A numeric column holds a non-numeric cell
    #[error("row {row}: {column} value '{value}' is not numeric")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    /// A numeric column without a zero-fill rule has an empty cell
    #[error("row {row}: {column} is missing")]
    MissingValue { row: usize, column: String },

    /// Support ratio requested for an incident with zero actual loss
    #[error("support ratio is undefined for fire {fire_id}: actual economic loss is zero")]
    UndefinedSupportRatio { fire_id: String },

    /// Table has a header but no rows
    #[error("dataset contains no rows")]
    Empty,

    /// CSV parsing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
