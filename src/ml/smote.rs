//! SMOTE oversampling for the severity classifier
//!
//! Every minority class is grown to the majority count by interpolating
//! between a sample and one of its same-class nearest neighbours:
//! `x_new = x_i + gap * (x_nn - x_i)` with `gap ~ U[0, 1)`.

use crate::error::{AppError, Result};
use linfa_nn::{distance::L2Dist, CommonNearestNeighbour, NearestNeighbour};
use ndarray::{Array2, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

/// Seeded SMOTE sampler
#[derive(Debug, Clone)]
pub struct Smote {
    k_neighbors: usize,
    seed: u64,
}

impl Smote {
    pub fn new(k_neighbors: usize, seed: u64) -> Self {
        Self {
            k_neighbors: k_neighbors.max(1),
            seed,
        }
    }

    /// Balance `labels` over `0..n_classes`.
    ///
    /// Original rows come first, then synthetic rows grouped by ascending class.
    /// A class with `count` samples uses `min(k, count - 1)` neighbours; a class
    /// with a single sample is grown by duplication.
    pub fn fit_resample(
        &self,
        x: &Array2<f64>,
        labels: &[usize],
        n_classes: usize,
    ) -> Result<(Array2<f64>, Vec<usize>)> {
        if x.nrows() != labels.len() {
            return Err(AppError::Training(format!(
                "feature rows {} do not match label count {}",
                x.nrows(),
                labels.len()
            )));
        }

        let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (row, &label) in labels.iter().enumerate() {
            members
                .get_mut(label)
                .ok_or_else(|| {
                    AppError::Training(format!(
                        "label {} out of range for {} classes",
                        label, n_classes
                    ))
                })?
                .push(row);
        }
        let target = members.iter().map(Vec::len).max().unwrap_or(0);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut synthetic: Vec<f64> = Vec::new();
        let mut out_labels = labels.to_vec();

        for (class, rows) in members.iter().enumerate() {
            if rows.is_empty() || rows.len() >= target {
                continue;
            }
            let needed = target - rows.len();
            let samples = x.select(Axis(0), rows);
            debug!(class, have = rows.len(), needed, "Oversampling class");

            if rows.len() == 1 {
                for _ in 0..needed {
                    synthetic.extend(samples.row(0).iter());
                }
            } else {
                let neighbours = self.neighbour_table(&samples)?;
                for _ in 0..needed {
                    let i = rng.gen_range(0..samples.nrows());
                    let j = neighbours[i][rng.gen_range(0..neighbours[i].len())];
                    let gap: f64 = rng.gen();
                    let base = samples.row(i);
                    let other = samples.row(j);
                    synthetic.extend(
                        base.iter()
                            .zip(other.iter())
                            .map(|(a, b)| a + gap * (b - a)),
                    );
                }
            }
            out_labels.extend(std::iter::repeat(class).take(needed));
        }

        let n_synthetic = out_labels.len() - labels.len();
        let extra = Array2::from_shape_vec((n_synthetic, x.ncols()), synthetic)
            .map_err(|e| AppError::Internal(format!("synthetic sample shape: {}", e)))?;
        let balanced = ndarray::concatenate(Axis(0), &[x.view(), extra.view()])
            .map_err(|e| AppError::Internal(format!("cannot append synthetic samples: {}", e)))?;

        Ok((balanced, out_labels))
    }

    /// k nearest same-class neighbours of every sample, excluding itself
    fn neighbour_table(&self, samples: &Array2<f64>) -> Result<Vec<Vec<usize>>> {
        let k = self.k_neighbors.min(samples.nrows() - 1);
        let index = CommonNearestNeighbour::LinearSearch
            .from_batch(samples, L2Dist)
            .map_err(|e| AppError::Training(format!("nearest-neighbour index: {}", e)))?;

        samples
            .outer_iter()
            .enumerate()
            .map(|(i, point)| {
                let found = index
                    .k_nearest(point, k + 1)
                    .map_err(|e| AppError::Training(format!("nearest-neighbour query: {}", e)))?;
                Ok(found
                    .into_iter()
                    .map(|(_, idx)| idx)
                    .filter(|&idx| idx != i)
                    .take(k)
                    .collect())
            })
            .collect()
    }
}

/// Per-class sample counts over `0..n_classes`
pub fn class_counts(labels: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; n_classes];
    for &label in labels {
        if let Some(c) = counts.get_mut(label) {
            *c += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imbalanced() -> (Array2<f64>, Vec<usize>) {
        let mut data = Vec::new();
        let mut labels = Vec::new();
        for i in 0..10 {
            data.extend([i as f64, 0.0]);
            labels.push(0);
        }
        for i in 0..3 {
            data.extend([100.0 + i as f64, 5.0]);
            labels.push(1);
        }
        data.extend([500.0, 50.0]);
        labels.push(2);
        (Array2::from_shape_vec((14, 2), data).unwrap(), labels)
    }

    #[test]
    fn test_classes_balanced_to_majority() {
        let (x, labels) = imbalanced();
        let (balanced, out) = Smote::new(5, 42).fit_resample(&x, &labels, 3).unwrap();

        assert_eq!(class_counts(&out, 3), vec![10, 10, 10]);
        assert_eq!(balanced.nrows(), 30);
        assert_eq!(balanced.ncols(), 2);
    }

    #[test]
    fn test_original_rows_preserved_first() {
        let (x, labels) = imbalanced();
        let (balanced, out) = Smote::new(5, 42).fit_resample(&x, &labels, 3).unwrap();

        assert_eq!(&out[..14], &labels[..]);
        for i in 0..14 {
            assert_eq!(balanced.row(i), x.row(i));
        }
    }

    #[test]
    fn test_synthetic_points_lie_between_class_members() {
        let (x, labels) = imbalanced();
        let (balanced, out) = Smote::new(5, 42).fit_resample(&x, &labels, 3).unwrap();

        for (row, &label) in balanced.outer_iter().zip(out.iter()).skip(14) {
            if label == 1 {
                assert!(row[0] >= 100.0 && row[0] <= 102.0);
                assert_eq!(row[1], 5.0);
            }
        }
    }

    #[test]
    fn test_single_sample_class_is_duplicated() {
        let (x, labels) = imbalanced();
        let (balanced, out) = Smote::new(5, 42).fit_resample(&x, &labels, 3).unwrap();

        for (row, &label) in balanced.outer_iter().zip(out.iter()) {
            if label == 2 {
                assert_eq!(row[0], 500.0);
                assert_eq!(row[1], 50.0);
            }
        }
    }

    #[test]
    fn test_resampling_is_deterministic() {
        let (x, labels) = imbalanced();
        let a = Smote::new(5, 42).fit_resample(&x, &labels, 3).unwrap();
        let b = Smote::new(5, 42).fit_resample(&x, &labels, 3).unwrap();
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
    }

    #[test]
    fn test_balanced_input_unchanged() {
        let x = Array2::from_shape_vec((4, 1), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let labels = vec![0, 1, 0, 1];
        let (balanced, out) = Smote::new(5, 42).fit_resample(&x, &labels, 2).unwrap();
        assert_eq!(balanced, x);
        assert_eq!(out, labels);
    }

    #[test]
    fn test_out_of_range_label_rejected() {
        let x = Array2::from_shape_vec((2, 1), vec![1.0, 2.0]).unwrap();
        assert!(Smote::new(5, 42).fit_resample(&x, &[0, 3], 2).is_err());
    }
}
