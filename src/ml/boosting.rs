//! Gradient-boosted regression trees
//!
//! Both ensembles stage smartcore regression trees:
//! - [`BoostedRegressor`] fits each tree on the residuals of the running prediction
//! - [`SoftmaxBoostingClassifier`] fits one tree per class per round on the
//!   softmax gradient `onehot - p`
//!
//! Raw scores accumulate `learning_rate * tree(x)` across stages.

use super::evaluation::to_dense_matrix;
use crate::error::{AppError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};

type RegressionTree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Boosting hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: u16,
    pub min_samples_leaf: usize,
}

impl BoostingParams {
    /// Shallow, slow-learning ensemble
    pub fn gradient_boosting() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
        }
    }

    /// Deeper, faster-learning ensemble
    pub fn boosted_trees() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_samples_leaf: 1,
        }
    }

    fn tree_parameters(&self) -> DecisionTreeRegressorParameters {
        DecisionTreeRegressorParameters::default()
            .with_max_depth(self.max_depth)
            .with_min_samples_leaf(self.min_samples_leaf)
    }

    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(AppError::Training(
                "boosting needs at least one estimator".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(AppError::Training(format!(
                "invalid learning rate {} (expected 0 < lr <= 1)",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

fn check_training_shape(x: &Array2<f64>, n_targets: usize) -> Result<()> {
    if x.nrows() == 0 {
        return Err(AppError::Training(
            "cannot fit on an empty training set".to_string(),
        ));
    }
    if x.nrows() != n_targets {
        return Err(AppError::Training(format!(
            "feature rows {} do not match target count {}",
            x.nrows(),
            n_targets
        )));
    }
    Ok(())
}

fn check_feature_count(x: &Array2<f64>, expected: usize) -> Result<()> {
    if x.ncols() != expected {
        return Err(AppError::Training(format!(
            "expected {} features, got {}",
            expected,
            x.ncols()
        )));
    }
    Ok(())
}

/// Least-squares gradient boosting regressor initialised at the target mean
#[derive(Debug)]
pub struct BoostedRegressor {
    params: BoostingParams,
    init_value: f64,
    stages: Vec<RegressionTree>,
    n_features: usize,
}

impl BoostedRegressor {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, params: BoostingParams) -> Result<Self> {
        params.validate()?;
        check_training_shape(x, y.len())?;

        let matrix = to_dense_matrix(x);
        let init_value = y.mean().unwrap_or(0.0);
        let mut raw = vec![init_value; y.len()];
        let mut stages = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&raw).map(|(t, f)| t - f).collect();
            let tree = RegressionTree::fit(&matrix, &residuals, params.tree_parameters())?;
            let update = tree.predict(&matrix)?;
            for (f, u) in raw.iter_mut().zip(update) {
                *f += params.learning_rate * u;
            }
            stages.push(tree);
        }

        Ok(Self {
            params,
            init_value,
            stages,
            n_features: x.ncols(),
        })
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        check_feature_count(x, self.n_features)?;
        let matrix = to_dense_matrix(x);
        let mut raw = vec![self.init_value; x.nrows()];
        for tree in &self.stages {
            let update = tree.predict(&matrix)?;
            for (f, u) in raw.iter_mut().zip(update) {
                *f += self.params.learning_rate * u;
            }
        }
        Ok(raw)
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }
}

/// Multiclass boosting with a softmax link over class indices `0..n_classes`
#[derive(Debug)]
pub struct SoftmaxBoostingClassifier {
    params: BoostingParams,
    n_classes: usize,
    /// stages[round][class]
    stages: Vec<Vec<RegressionTree>>,
    n_features: usize,
}

impl SoftmaxBoostingClassifier {
    pub fn fit(
        x: &Array2<f64>,
        labels: &[usize],
        n_classes: usize,
        params: BoostingParams,
    ) -> Result<Self> {
        params.validate()?;
        check_training_shape(x, labels.len())?;
        if n_classes < 2 {
            return Err(AppError::Training(format!(
                "classification needs at least two classes, got {}",
                n_classes
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= n_classes) {
            return Err(AppError::Training(format!(
                "label {} out of range for {} classes",
                bad, n_classes
            )));
        }

        let matrix = to_dense_matrix(x);
        let n_samples = labels.len();
        let mut raw = Array2::<f64>::zeros((n_samples, n_classes));
        let mut stages = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let proba = softmax_rows(&raw);
            let mut round = Vec::with_capacity(n_classes);

            for class in 0..n_classes {
                let gradient: Vec<f64> = labels
                    .iter()
                    .enumerate()
                    .map(|(i, &label)| {
                        let target = if label == class { 1.0 } else { 0.0 };
                        target - proba[[i, class]]
                    })
                    .collect();

                let tree = RegressionTree::fit(&matrix, &gradient, params.tree_parameters())?;
                let update = tree.predict(&matrix)?;
                for (i, u) in update.into_iter().enumerate() {
                    raw[[i, class]] += params.learning_rate * u;
                }
                round.push(tree);
            }
            stages.push(round);
        }

        Ok(Self {
            params,
            n_classes,
            stages,
            n_features: x.ncols(),
        })
    }

    /// Class probabilities, one row per sample
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_feature_count(x, self.n_features)?;
        let matrix = to_dense_matrix(x);
        let mut raw = Array2::<f64>::zeros((x.nrows(), self.n_classes));

        for round in &self.stages {
            for (class, tree) in round.iter().enumerate() {
                let update = tree.predict(&matrix)?;
                for (i, u) in update.into_iter().enumerate() {
                    raw[[i, class]] += self.params.learning_rate * u;
                }
            }
        }

        Ok(softmax_rows(&raw))
    }

    /// Most probable class index per sample; ties go to the lowest index
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.axis_iter(Axis(0)).map(|row| argmax(row.iter())).collect())
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

fn softmax_rows(raw: &Array2<f64>) -> Array2<f64> {
    let mut out = raw.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    out
}

pub(crate) fn argmax<'a>(values: impl Iterator<Item = &'a f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, &v) in values.enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 } else { 1.0 });
        let y = Array1::from_iter((0..40).map(|i| if i < 20 { 10.0 } else { 50.0 }));
        (x, y)
    }

    #[test]
    fn test_regressor_learns_step_function() {
        let (x, y) = step_data();
        let model = BoostedRegressor::fit(&x, &y, BoostingParams::gradient_boosting()).unwrap();
        let preds = model.predict(&x).unwrap();

        assert_eq!(model.n_stages(), 100);
        assert!((preds[0] - 10.0).abs() < 0.5);
        assert!((preds[39] - 50.0).abs() < 0.5);
    }

    #[test]
    fn test_regressor_single_stage_moves_towards_target() {
        let (x, y) = step_data();
        let params = BoostingParams {
            n_estimators: 1,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
        };
        let model = BoostedRegressor::fit(&x, &y, params).unwrap();
        let preds = model.predict(&x).unwrap();

        // mean 30, one step of 0.1 * residual
        assert!((preds[0] - 28.0).abs() < 1e-9);
        assert!((preds[39] - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_regressor_rejects_wrong_feature_count() {
        let (x, y) = step_data();
        let model = BoostedRegressor::fit(&x, &y, BoostingParams::gradient_boosting()).unwrap();
        let wrong = Array2::<f64>::zeros((1, 3));
        assert!(model.predict(&wrong).is_err());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let (x, y) = step_data();
        let params = BoostingParams {
            learning_rate: 0.0,
            ..BoostingParams::gradient_boosting()
        };
        assert!(BoostedRegressor::fit(&x, &y, params).is_err());
    }

    #[test]
    fn test_classifier_separates_three_classes() {
        let x = Array2::from_shape_fn((30, 1), |(i, _)| i as f64);
        let labels: Vec<usize> = (0..30).map(|i| i / 10).collect();
        let model =
            SoftmaxBoostingClassifier::fit(&x, &labels, 3, BoostingParams::boosted_trees())
                .unwrap();

        let preds = model.predict(&x).unwrap();
        assert_eq!(preds, labels);

        let proba = model.predict_proba(&x).unwrap();
        for row in proba.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert!(proba[[0, 0]] > 0.9);
    }

    #[test]
    fn test_classifier_rejects_out_of_range_label() {
        let x = Array2::from_shape_fn((4, 1), |(i, _)| i as f64);
        let result = SoftmaxBoostingClassifier::fit(
            &x,
            &[0, 1, 2, 1],
            2,
            BoostingParams::boosted_trees(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_softmax_rows_stable_for_large_scores() {
        let raw = Array2::from_shape_vec((1, 2), vec![1000.0, 1000.0]).unwrap();
        let p = softmax_rows(&raw);
        assert!((p[[0, 0]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax([0.2, 0.4, 0.4].iter()), 1);
    }
}
