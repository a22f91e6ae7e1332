//! Seeded train/test splitting

use ndarray::{Array1, Array2, Axis};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Row indices of a train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    /// Shuffle `0..n_samples` with `seed` and hold out `ceil(test_size * n)` rows.
    ///
    /// Both sides keep at least one row whenever `n_samples >= 2`.
    pub fn new(n_samples: usize, test_size: f64, seed: u64) -> Self {
        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let mut n_test = (test_size * n_samples as f64).ceil() as usize;
        if n_samples >= 2 {
            n_test = n_test.clamp(1, n_samples - 1);
        } else {
            n_test = 0;
        }

        let train = indices.split_off(n_test);
        Self {
            train,
            test: indices,
        }
    }

    pub fn rows(&self, x: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
        (x.select(Axis(0), &self.train), x.select(Axis(0), &self.test))
    }

    pub fn targets(&self, y: &Array1<f64>) -> (Array1<f64>, Array1<f64>) {
        (y.select(Axis(0), &self.train), y.select(Axis(0), &self.test))
    }

    pub fn labels<T: Copy>(&self, y: &[T]) -> (Vec<T>, Vec<T>) {
        (
            self.train.iter().map(|&i| y[i]).collect(),
            self.test.iter().map(|&i| y[i]).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_sizes() {
        let split = SplitIndices::new(100, 0.2, 42);
        assert_eq!(split.train.len(), 80);
        assert_eq!(split.test.len(), 20);

        let split = SplitIndices::new(11, 0.2, 42);
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 8);
    }

    #[test]
    fn test_split_is_a_partition() {
        let split = SplitIndices::new(37, 0.2, 7);
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..37).collect::<Vec<_>>());

        let train: HashSet<_> = split.train.iter().collect();
        assert!(split.test.iter().all(|i| !train.contains(i)));
    }

    #[test]
    fn test_split_reproducible_with_same_seed() {
        let a = SplitIndices::new(50, 0.2, 42);
        let b = SplitIndices::new(50, 0.2, 42);
        assert_eq!(a, b);

        let c = SplitIndices::new(50, 0.2, 43);
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn test_split_keeps_both_sides_non_empty() {
        let split = SplitIndices::new(2, 0.9, 42);
        assert_eq!(split.train.len(), 1);
        assert_eq!(split.test.len(), 1);
    }

    #[test]
    fn test_rows_and_targets_follow_indices() {
        let x = Array2::from_shape_fn((5, 2), |(i, j)| (i * 10 + j) as f64);
        let y = Array1::from_iter((0..5).map(|i| i as f64));
        let split = SplitIndices::new(5, 0.2, 42);

        let (x_train, x_test) = split.rows(&x);
        let (y_train, y_test) = split.targets(&y);
        assert_eq!(x_train.nrows(), 4);
        assert_eq!(x_test.nrows(), 1);
        for (row, target) in x_test.outer_iter().zip(y_test.iter()) {
            assert_eq!(row[0], target * 10.0);
        }
        assert_eq!(y_train.len(), 4);
    }
}
