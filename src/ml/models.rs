use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{AsRefStr, EnumIter, EnumString};

/// Regression estimators compared during training
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RegressorKind {
    /// Ordinary least squares
    LinearRegression,

    /// Bagged regression trees
    RandomForest,

    /// Shallow trees, small learning rate
    GradientBoosting,

    /// Deeper trees, larger learning rate
    BoostedTrees,
}

impl std::fmt::Display for RegressorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegressorKind::LinearRegression => write!(f, "Linear Regression"),
            RegressorKind::RandomForest => write!(f, "Random Forest"),
            RegressorKind::GradientBoosting => write!(f, "Gradient Boosting"),
            RegressorKind::BoostedTrees => write!(f, "Gradient-Boosted Trees"),
        }
    }
}

/// Regression error metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

/// Per-class evaluation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Classification report keyed by decoded severity value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub per_class: BTreeMap<i64, ClassMetrics>,
}

/// Outcome of fitting one regression candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateReport {
    pub kind: RegressorKind,
    pub metrics: Option<RegressionMetrics>,
    pub error: Option<String>,
    pub fit_seconds: f64,
}

/// Train/test row counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSizes {
    pub train: usize,
    pub test: usize,
}

/// Regression stage summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionReport {
    /// Configured production estimator
    pub production: RegressorKind,

    /// Highest-R² candidate; informational only
    pub best_by_r2: Option<RegressorKind>,

    pub split: SplitSizes,
    pub candidates: Vec<CandidateReport>,
}

/// Predicted severity with its response tier, as reported for test rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAllocation {
    pub predicted_fsi: i64,
    pub suggested_response: String,
}

/// Classification stage summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationSummary {
    pub classes: Vec<i64>,
    pub balanced_rows: usize,
    pub split: SplitSizes,
    pub report: ClassificationReport,
    pub sample_allocations: Vec<TierAllocation>,
}

/// Forecasting stage summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub months: usize,
    pub first_month: Option<String>,
    pub last_month: Option<String>,
    /// Labels of the forecast horizon, `YYYY-MM`
    pub forecast_months: Vec<String>,
    pub historical_max: f64,
    pub arima_error: Option<String>,
    pub lstm_error: Option<String>,
    pub arima_sigma2: Option<f64>,
    pub lstm_final_loss: Option<f64>,
}

/// Everything learned at startup, served by the model report endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub rows: usize,
    pub features: usize,
    pub regression: RegressionReport,
    pub classification: ClassificationSummary,
    pub forecasting: ForecastSummary,
}
