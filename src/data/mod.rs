//! Incident data preparation
//!
//! Turns the raw wildfire incident CSV into the model-ready encoded table:
//! - Zero-fill of loss columns where "no loss reported"
//! - Day-first date parsing
//! - Engineered aggregate, deviation and support-ratio columns
//! - Deterministic one-hot encoding of categorical columns

pub mod columns;
pub mod error;
pub mod prepare;
pub mod table;

pub use error::{DataError, DataResult};
pub use prepare::{
    clean, encode, prepare_dataset, round_to, support_ratio, Cell, ColumnKind,
    LossDistribution, PreparationSummary, PreparedTable,
};
pub use table::{parse_day_first, EncodedTable, FeatureSchema, RawTable, SchemaMismatch};
