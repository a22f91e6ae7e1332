use serde::{Deserialize, Serialize};

/// Min-max scaling onto `[0, 1]`.
///
/// A constant series gets a unit range so transform and inverse stay defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    range: f64,
}

impl MinMaxScaler {
    pub fn fit(values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() || !max.is_finite() {
            return Self { min: 0.0, range: 1.0 };
        }
        let range = if max > min { max - min } else { 1.0 };
        Self { min, range }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.range
    }

    pub fn inverse(&self, scaled: f64) -> f64 {
        scaled * self.range + self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scales_to_unit_interval() {
        let scaler = MinMaxScaler::fit(&[10.0, 20.0, 30.0]);
        assert_eq!(scaler.transform(10.0), 0.0);
        assert_eq!(scaler.transform(30.0), 1.0);
        assert_eq!(scaler.transform(20.0), 0.5);
        assert_eq!(scaler.inverse(0.5), 20.0);
    }

    #[test]
    fn test_constant_series_uses_unit_range() {
        let scaler = MinMaxScaler::fit(&[7.0, 7.0, 7.0]);
        assert_eq!(scaler.transform(7.0), 0.0);
        assert_eq!(scaler.inverse(0.25), 7.25);
    }
}
