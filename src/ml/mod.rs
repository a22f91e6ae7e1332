/// Economic-loss regression and severity classification
///
/// - Four regressors compared on a seeded hold-out split
/// - Gradient-boosted softmax classifier over SMOTE-balanced severities
/// - Response-tier mapping for predicted severities
/// - [`PredictionService`] bundling every fitted artifact for serving

pub mod boosting;
pub mod classifier;
pub mod evaluation;
pub mod models;
pub mod regression;
pub mod service;
pub mod smote;
pub mod split;

pub use boosting::{BoostedRegressor, BoostingParams, SoftmaxBoostingClassifier};
pub use classifier::{LabelEncoder, ResponseTier, SeverityClassifier, SeverityPrediction};
pub use evaluation::{classification_report, regression_metrics};
pub use models::{
    CandidateReport, ClassMetrics, ClassificationReport, ClassificationSummary, ForecastSummary,
    RegressionMetrics, RegressionReport, RegressorKind, SplitSizes, TierAllocation,
    TrainingReport,
};
pub use regression::{fit_regressor, train_regressors, RegressionOutcome, Regressor};
pub use service::{PredictionService, LOSS_DECIMALS};
pub use smote::Smote;
pub use split::SplitIndices;
