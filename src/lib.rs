//! Wildfire economic-loss and severity prediction service.
//!
//! Prepares the incident dataset, trains the loss regressor, the severity
//! classifier and two monthly loss forecasters at startup, then serves them
//! over a JSON API.

pub mod api;
pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod forecast;
pub mod metrics;
pub mod ml;

pub use error::{AppError, Result};
