//! Hold-out evaluation metrics

use super::models::{ClassMetrics, ClassificationReport, RegressionMetrics};
use crate::error::{AppError, Result};
use ndarray::Array2;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::collections::BTreeMap;

/// Convert an ndarray feature matrix into smartcore's row-major dense matrix
pub(crate) fn to_dense_matrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
    let shape = arr.shape();
    let data: Vec<f64> = arr.iter().copied().collect();
    DenseMatrix::new(shape[0], shape[1], data, false)
}

/// Compute MSE, RMSE, MAE and R² for a set of predictions.
///
/// Mismatched lengths, empty input and non-finite predictions are errors.
pub fn regression_metrics(y_true: &[f64], y_pred: &[f64]) -> Result<RegressionMetrics> {
    if y_true.len() != y_pred.len() {
        return Err(AppError::Training(format!(
            "prediction count {} does not match target count {}",
            y_pred.len(),
            y_true.len()
        )));
    }
    if y_true.is_empty() {
        return Err(AppError::Training(
            "cannot evaluate an empty test set".to_string(),
        ));
    }
    if let Some(pos) = y_pred.iter().position(|p| !p.is_finite()) {
        return Err(AppError::Training(format!(
            "non-finite prediction at test row {}",
            pos
        )));
    }

    let n = y_true.len() as f64;
    let mse = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n;
    let mae = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / n;

    let mean = y_true.iter().sum::<f64>() / n;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res = mse * n;
    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    Ok(RegressionMetrics {
        mse,
        rmse: mse.sqrt(),
        mae,
        r2,
    })
}

/// Build a classification report over decoded class values.
///
/// `classes` lists every class the model knows about; classes absent from
/// both truth and predictions still get a row with zero support.
pub fn classification_report(
    y_true: &[i64],
    y_pred: &[i64],
    classes: &[i64],
) -> Result<ClassificationReport> {
    if y_true.len() != y_pred.len() {
        return Err(AppError::Training(format!(
            "prediction count {} does not match label count {}",
            y_pred.len(),
            y_true.len()
        )));
    }
    if y_true.is_empty() {
        return Err(AppError::Training(
            "cannot evaluate an empty test set".to_string(),
        ));
    }

    let n_samples = y_true.len();
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    let accuracy = correct as f64 / n_samples as f64;

    let mut per_class = BTreeMap::new();
    for &class in classes {
        let tp = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| **t == class && **p == class)
            .count();
        let fp = y_pred
            .iter()
            .zip(y_true.iter())
            .filter(|(p, t)| **p == class && **t != class)
            .count();
        let fn_count = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| **t == class && **p != class)
            .count();

        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };
        let recall = if tp + fn_count > 0 {
            tp as f64 / (tp + fn_count) as f64
        } else {
            0.0
        };
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        let support = y_true.iter().filter(|&&t| t == class).count();

        per_class.insert(
            class,
            ClassMetrics {
                precision,
                recall,
                f1_score,
                support,
            },
        );
    }

    let n_classes = per_class.len().max(1) as f64;
    let macro_precision = per_class.values().map(|m| m.precision).sum::<f64>() / n_classes;
    let macro_recall = per_class.values().map(|m| m.recall).sum::<f64>() / n_classes;
    let macro_f1 = per_class.values().map(|m| m.f1_score).sum::<f64>() / n_classes;

    Ok(ClassificationReport {
        accuracy,
        macro_precision,
        macro_recall,
        macro_f1,
        per_class,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_regression() {
        let y = vec![1.0, 2.0, 3.0, 4.0];
        let metrics = regression_metrics(&y, &y).unwrap();
        assert_eq!(metrics.mse, 0.0);
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.r2, 1.0);
    }

    #[test]
    fn test_regression_metrics_values() {
        let y_true = vec![3.0, -0.5, 2.0, 7.0];
        let y_pred = vec![2.5, 0.0, 2.0, 8.0];
        let metrics = regression_metrics(&y_true, &y_pred).unwrap();

        assert!((metrics.mse - 0.375).abs() < 1e-12);
        assert!((metrics.rmse - 0.375f64.sqrt()).abs() < 1e-12);
        assert!((metrics.mae - 0.5).abs() < 1e-12);
        assert!((metrics.r2 - 0.948_608_137_044_967_9).abs() < 1e-9);
    }

    #[test]
    fn test_mean_prediction_has_zero_r2() {
        let y_true = vec![1.0, 2.0, 3.0];
        let y_pred = vec![2.0, 2.0, 2.0];
        let metrics = regression_metrics(&y_true, &y_pred).unwrap();
        assert!(metrics.r2.abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let result = regression_metrics(&[1.0, 2.0], &[1.0]);
        assert!(matches!(result, Err(AppError::Training(_))));
    }

    #[test]
    fn test_non_finite_prediction_is_error() {
        let result = regression_metrics(&[1.0, 2.0], &[1.0, f64::NAN]);
        assert!(matches!(result, Err(AppError::Training(_))));
    }

    #[test]
    fn test_classification_report() {
        let y_true = vec![6, 6, 7, 8, 8, 8];
        let y_pred = vec![6, 7, 7, 8, 8, 6];
        let report = classification_report(&y_true, &y_pred, &[6, 7, 8, 9]).unwrap();

        assert!((report.accuracy - 4.0 / 6.0).abs() < 1e-12);

        let six = &report.per_class[&6];
        assert!((six.precision - 0.5).abs() < 1e-12);
        assert!((six.recall - 0.5).abs() < 1e-12);
        assert_eq!(six.support, 2);

        let eight = &report.per_class[&8];
        assert!((eight.precision - 1.0).abs() < 1e-12);
        assert!((eight.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((eight.f1_score - 0.8).abs() < 1e-12);

        let nine = &report.per_class[&9];
        assert_eq!(nine.support, 0);
        assert_eq!(nine.f1_score, 0.0);
        assert_eq!(report.per_class.len(), 4);
    }
}
