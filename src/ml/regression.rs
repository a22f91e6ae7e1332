//! Economic-loss regressors and the candidate comparison run

use super::boosting::{BoostedRegressor, BoostingParams};
use super::evaluation::{regression_metrics, to_dense_matrix};
use super::models::{CandidateReport, RegressionReport, RegressorKind, SplitSizes};
use super::split::SplitIndices;
use crate::config::TrainingConfig;
use crate::error::{AppError, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use std::time::Instant;
use strum::IntoEnumIterator;
use tracing::{info, warn};

/// A fitted economic-loss model
pub trait Regressor: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> RegressorKind;

    /// Predict one value per feature row
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>>;
}

/// Least squares via SVD
#[derive(Debug)]
pub struct LinearLossRegressor {
    model: LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>,
}

impl LinearLossRegressor {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        let params =
            LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::SVD);
        let model = LinearRegression::fit(&to_dense_matrix(x), &y.to_vec(), params)?;
        Ok(Self { model })
    }
}

impl Regressor for LinearLossRegressor {
    fn kind(&self) -> RegressorKind {
        RegressorKind::LinearRegression
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        Ok(self.model.predict(&to_dense_matrix(features))?)
    }
}

/// Bagged regression trees using every feature at each split
#[derive(Debug)]
pub struct ForestLossRegressor {
    model: RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
}

impl ForestLossRegressor {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, n_trees: usize, seed: u64) -> Result<Self> {
        let mut params = RandomForestRegressorParameters::default();
        params.n_trees = n_trees
            .try_into()
            .map_err(|_| AppError::Training(format!("too many forest trees: {}", n_trees)))?;
        params.m = Some(x.ncols());
        params.seed = seed;
        let model = RandomForestRegressor::fit(&to_dense_matrix(x), &y.to_vec(), params)?;
        Ok(Self { model })
    }
}

impl Regressor for ForestLossRegressor {
    fn kind(&self) -> RegressorKind {
        RegressorKind::RandomForest
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        Ok(self.model.predict(&to_dense_matrix(features))?)
    }
}

/// Boosted trees tagged with the configuration they were fitted under
#[derive(Debug)]
pub struct BoostedLossRegressor {
    kind: RegressorKind,
    model: BoostedRegressor,
}

impl Regressor for BoostedLossRegressor {
    fn kind(&self) -> RegressorKind {
        self.kind
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        self.model.predict(features)
    }
}

/// Fit one regressor of the given kind
pub fn fit_regressor(
    kind: RegressorKind,
    x: &Array2<f64>,
    y: &Array1<f64>,
    config: &TrainingConfig,
) -> Result<Box<dyn Regressor>> {
    let model: Box<dyn Regressor> = match kind {
        RegressorKind::LinearRegression => Box::new(LinearLossRegressor::fit(x, y)?),
        RegressorKind::RandomForest => Box::new(ForestLossRegressor::fit(
            x,
            y,
            config.random_forest_trees,
            config.seed,
        )?),
        RegressorKind::GradientBoosting => Box::new(BoostedLossRegressor {
            kind,
            model: BoostedRegressor::fit(x, y, config.gradient_boosting_params())?,
        }),
        RegressorKind::BoostedTrees => Box::new(BoostedLossRegressor {
            kind,
            model: BoostedRegressor::fit(x, y, config.boosted_trees_params())?,
        }),
    };
    Ok(model)
}

/// Production model plus the comparison report
#[derive(Debug)]
pub struct RegressionOutcome {
    pub model: Box<dyn Regressor>,
    pub report: RegressionReport,
}

/// Fit every candidate on the same split, report hold-out metrics, and keep
/// the configured production kind.
///
/// A failing comparison candidate is recorded in the report; a failing
/// production candidate aborts training.
pub fn train_regressors(
    x: &Array2<f64>,
    y: &Array1<f64>,
    config: &TrainingConfig,
) -> Result<RegressionOutcome> {
    let split = SplitIndices::new(x.nrows(), config.test_size, config.seed);
    if split.test.is_empty() {
        return Err(AppError::Training(format!(
            "need at least two incidents to hold out a test set, got {}",
            x.nrows()
        )));
    }
    let (x_train, x_test) = split.rows(x);
    let (y_train, y_test) = split.targets(y);
    let y_test = y_test.to_vec();

    info!(
        train_rows = x_train.nrows(),
        test_rows = x_test.nrows(),
        features = x.ncols(),
        "Fitting economic-loss regressors"
    );

    let fitted: Vec<(RegressorKind, Result<Box<dyn Regressor>>, f64)> = RegressorKind::iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|kind| {
            let started = Instant::now();
            let model = fit_regressor(kind, &x_train, &y_train, config);
            (kind, model, started.elapsed().as_secs_f64())
        })
        .collect();

    let mut candidates = Vec::with_capacity(fitted.len());
    let mut production = None;

    for (kind, model, fit_seconds) in fitted {
        let evaluated = model.and_then(|m| {
            let preds = m.predict(&x_test)?;
            let metrics = regression_metrics(&y_test, &preds)?;
            Ok((m, metrics))
        });

        match evaluated {
            Ok((model, metrics)) => {
                info!(
                    regressor = %kind,
                    mse = metrics.mse,
                    rmse = metrics.rmse,
                    mae = metrics.mae,
                    r2 = metrics.r2,
                    fit_seconds,
                    "Regressor evaluated"
                );
                candidates.push(CandidateReport {
                    kind,
                    metrics: Some(metrics),
                    error: None,
                    fit_seconds,
                });
                if kind == config.production_regressor {
                    production = Some(model);
                }
            }
            Err(e) => {
                if kind == config.production_regressor {
                    return Err(AppError::Training(format!(
                        "production regressor {} failed: {}",
                        kind, e
                    )));
                }
                warn!(regressor = %kind, error = %e, "Regressor candidate failed");
                candidates.push(CandidateReport {
                    kind,
                    metrics: None,
                    error: Some(e.to_string()),
                    fit_seconds,
                });
            }
        }
    }

    let best_by_r2 = candidates
        .iter()
        .filter_map(|c| c.metrics.map(|m| (c.kind, m.r2)))
        .fold(None, |best: Option<(RegressorKind, f64)>, (kind, r2)| match best {
            Some((_, best_r2)) if best_r2 >= r2 => best,
            _ => Some((kind, r2)),
        })
        .map(|(kind, _)| kind);

    if let Some(best) = best_by_r2 {
        info!(
            best = %best,
            production = %config.production_regressor,
            "Best regressor by hold-out R²"
        );
    }

    let model = production.ok_or_else(|| {
        AppError::Training(format!(
            "production regressor {} was not fitted",
            config.production_regressor
        ))
    })?;

    Ok(RegressionOutcome {
        model,
        report: RegressionReport {
            production: config.production_regressor,
            best_by_r2,
            split: SplitSizes {
                train: split.train.len(),
                test: split.test.len(),
            },
            candidates,
        },
    })
}

impl TrainingConfig {
    pub fn gradient_boosting_params(&self) -> BoostingParams {
        BoostingParams {
            n_estimators: self.n_estimators,
            learning_rate: self.gradient_boosting_learning_rate,
            max_depth: self.gradient_boosting_max_depth,
            ..BoostingParams::gradient_boosting()
        }
    }

    pub fn boosted_trees_params(&self) -> BoostingParams {
        BoostingParams {
            n_estimators: self.n_estimators,
            learning_rate: self.boosted_trees_learning_rate,
            max_depth: self.boosted_trees_max_depth,
            ..BoostingParams::boosted_trees()
        }
    }
}
