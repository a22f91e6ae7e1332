use super::boosting::{argmax, SoftmaxBoostingClassifier};
use super::evaluation::classification_report;
use super::models::{ClassificationSummary, SplitSizes, TierAllocation};
use super::smote::{class_counts, Smote};
use super::split::SplitIndices;
use crate::config::TrainingConfig;
use crate::data::{columns::SEVERITY_INDEX, DataError};
use crate::error::{AppError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter};
use tracing::info;

/// Number of test-set predictions echoed into the training report
const SAMPLE_ALLOCATIONS: usize = 5;

/// Recommended response for a predicted severity
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumIter,
)]
pub enum ResponseTier {
    #[serde(rename = "Full Emergency Response + Evacuation")]
    #[strum(serialize = "Full Emergency Response + Evacuation")]
    FullEmergency,

    #[serde(rename = "Moderate Response Team")]
    #[strum(serialize = "Moderate Response Team")]
    ModerateResponse,

    #[serde(rename = "Monitor Only")]
    #[strum(serialize = "Monitor Only")]
    MonitorOnly,
}

impl ResponseTier {
    /// Map a severity value to its tier; there is no upper bound
    pub fn for_severity(severity: i64) -> Self {
        if severity >= 8 {
            ResponseTier::FullEmergency
        } else if severity >= 7 {
            ResponseTier::ModerateResponse
        } else {
            ResponseTier::MonitorOnly
        }
    }
}

/// Maps distinct severity values to contiguous class indices in ascending order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<i64>,
}

impl LabelEncoder {
    /// Learn the class set. Severities must be integral.
    pub fn fit(severities: &Array1<f64>) -> Result<Self> {
        let mut classes = Vec::new();
        for (row, &value) in severities.iter().enumerate() {
            if !value.is_finite() || value.fract() != 0.0 {
                return Err(DataError::InvalidNumber {
                    row,
                    column: SEVERITY_INDEX.to_string(),
                    value: value.to_string(),
                }
                .into());
            }
            classes.push(value as i64);
        }
        classes.sort_unstable();
        classes.dedup();
        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn encode(&self, severity: i64) -> Option<usize> {
        self.classes.binary_search(&severity).ok()
    }

    pub fn decode(&self, index: usize) -> Option<i64> {
        self.classes.get(index).copied()
    }

    /// Encode a column already validated by [`LabelEncoder::fit`]
    pub fn transform(&self, severities: &Array1<f64>) -> Result<Vec<usize>> {
        severities
            .iter()
            .map(|&v| {
                self.encode(v as i64).ok_or_else(|| {
                    AppError::Training(format!("severity {} was not seen during fitting", v))
                })
            })
            .collect()
    }

    fn decode_all(&self, indices: &[usize]) -> Result<Vec<i64>> {
        indices
            .iter()
            .map(|&i| {
                self.decode(i)
                    .ok_or_else(|| AppError::Internal(format!("class index {} out of range", i)))
            })
            .collect()
    }
}

/// Severity prediction for one incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityPrediction {
    pub severity: i64,
    pub response: ResponseTier,
    pub confidence: f64,
}

/// Fitted severity classifier with its label encoding
#[derive(Debug)]
pub struct SeverityClassifier {
    encoder: LabelEncoder,
    model: SoftmaxBoostingClassifier,
}

impl SeverityClassifier {
    /// Label-encode, balance with SMOTE, split, fit and evaluate.
    pub fn train(
        x: &Array2<f64>,
        severities: &Array1<f64>,
        config: &TrainingConfig,
    ) -> Result<(Self, ClassificationSummary)> {
        let encoder = LabelEncoder::fit(severities)?;
        if encoder.n_classes() < 2 {
            return Err(AppError::Training(format!(
                "severity classifier needs at least two classes, found {:?}",
                encoder.classes()
            )));
        }
        let labels = encoder.transform(severities)?;
        let n_classes = encoder.n_classes();

        let smote = Smote::new(config.smote_k_neighbors, config.seed);
        let (balanced_x, balanced_labels) = smote.fit_resample(x, &labels, n_classes)?;
        info!(
            before = ?class_counts(&labels, n_classes),
            after = ?class_counts(&balanced_labels, n_classes),
            "Balanced severity classes"
        );

        let split = SplitIndices::new(balanced_x.nrows(), config.test_size, config.seed);
        let (x_train, x_test) = split.rows(&balanced_x);
        let (y_train, y_test) = split.labels(&balanced_labels);

        let model = SoftmaxBoostingClassifier::fit(
            &x_train,
            &y_train,
            n_classes,
            config.boosted_trees_params(),
        )?;
        let classifier = Self { encoder, model };

        let predicted = classifier.encoder.decode_all(&classifier.model.predict(&x_test)?)?;
        let actual = classifier.encoder.decode_all(&y_test)?;
        let report = classification_report(&actual, &predicted, classifier.encoder.classes())?;

        info!(
            accuracy = report.accuracy,
            macro_f1 = report.macro_f1,
            classes = n_classes,
            "Severity classifier evaluated"
        );

        let sample_allocations = predicted
            .iter()
            .take(SAMPLE_ALLOCATIONS)
            .map(|&severity| TierAllocation {
                predicted_fsi: severity,
                suggested_response: ResponseTier::for_severity(severity).to_string(),
            })
            .collect();

        let summary = ClassificationSummary {
            classes: classifier.encoder.classes().to_vec(),
            balanced_rows: balanced_x.nrows(),
            split: SplitSizes {
                train: split.train.len(),
                test: split.test.len(),
            },
            report,
            sample_allocations,
        };

        Ok((classifier, summary))
    }

    /// Predict severity and response tier for one schema-ordered feature row
    pub fn predict(&self, features: &[f64]) -> Result<SeverityPrediction> {
        let row = Array2::from_shape_vec((1, features.len()), features.to_vec())
            .map_err(|e| AppError::Internal(format!("feature row shape: {}", e)))?;
        let proba = self.model.predict_proba(&row)?;
        let class = argmax(proba.row(0).iter());
        let severity = self
            .encoder
            .decode(class)
            .ok_or_else(|| AppError::Internal(format!("class index {} out of range", class)))?;

        Ok(SeverityPrediction {
            severity,
            response: ResponseTier::for_severity(severity),
            confidence: proba[[0, class]],
        })
    }

    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }
}
