//! ARIMA(1,1,1) forecaster
//!
//! The series is differenced once and an ARMA(1,1) without constant,
//!
//! `w_t = phi * w_{t-1} + e_t + theta * e_{t-1}`,
//!
//! is fitted by conditional sum of squares (pre-sample residual zero).
//! Coefficients come from a grid over the stationary and invertible region
//! `(-1, 1)²` followed by a finer search around the coarse optimum, so the
//! fit is deterministic. Forecasts set future shocks to zero and integrate
//! back onto the level of the last observation.

use super::error::{ForecastError, ForecastResult};
use serde::Serialize;

/// Fewest monthly points that leave two differenced residuals to score
pub const ARIMA_MIN_POINTS: usize = 4;

const COARSE_STEP: f64 = 0.01;
const FINE_STEP: f64 = 0.001;
const BOUND: f64 = 0.999;

/// Fitted ARIMA(1,1,1) state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArimaForecaster {
    phi: f64,
    theta: f64,
    sigma2: f64,
    last_level: f64,
    last_diff: f64,
    last_residual: f64,
}

struct CssFit {
    sse: f64,
    last_residual: f64,
}

fn conditional_sse(diffs: &[f64], phi: f64, theta: f64) -> CssFit {
    let mut prev_residual = 0.0;
    let mut sse = 0.0;
    for t in 1..diffs.len() {
        let residual = diffs[t] - phi * diffs[t - 1] - theta * prev_residual;
        sse += residual * residual;
        prev_residual = residual;
    }
    CssFit {
        sse,
        last_residual: prev_residual,
    }
}

/// Lowest-SSE `(phi, theta)` over a square grid; `start` wins ties
fn grid_search(
    diffs: &[f64],
    start: (f64, f64),
    centre: (f64, f64),
    half_width: i32,
    step: f64,
) -> (f64, f64, f64) {
    let mut best = start;
    let mut best_sse = conditional_sse(diffs, start.0, start.1).sse;

    for i in -half_width..=half_width {
        let phi = centre.0 + i as f64 * step;
        if phi.abs() > BOUND {
            continue;
        }
        for j in -half_width..=half_width {
            let theta = centre.1 + j as f64 * step;
            if theta.abs() > BOUND {
                continue;
            }
            let sse = conditional_sse(diffs, phi, theta).sse;
            if sse < best_sse {
                best_sse = sse;
                best = (phi, theta);
            }
        }
    }
    (best.0, best.1, best_sse)
}

impl ArimaForecaster {
    pub fn fit(series: &[f64]) -> ForecastResult<Self> {
        if series.len() < ARIMA_MIN_POINTS {
            return Err(ForecastError::InsufficientHistory {
                required: ARIMA_MIN_POINTS,
                available: series.len(),
            });
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Model(
                "series contains non-finite values".to_string(),
            ));
        }

        let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

        let (phi, theta, _) = grid_search(&diffs, (0.0, 0.0), (0.0, 0.0), 99, COARSE_STEP);
        let (phi, theta, sse) = grid_search(&diffs, (phi, theta), (phi, theta), 10, FINE_STEP);

        let fit = conditional_sse(&diffs, phi, theta);
        let n_residuals = (diffs.len() - 1) as f64;

        let (last_level, last_diff) = match (series.last(), diffs.last()) {
            (Some(&level), Some(&diff)) => (level, diff),
            _ => {
                return Err(ForecastError::Model(
                    "series too short after differencing".to_string(),
                ))
            }
        };

        Ok(Self {
            phi,
            theta,
            sigma2: sse / n_residuals,
            last_level,
            last_diff,
            last_residual: fit.last_residual,
        })
    }

    /// Level forecasts for the next `steps` periods, in chronological order
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        let mut level = self.last_level;
        let mut diff = self.last_diff;
        let mut shock = self.last_residual;
        let mut out = Vec::with_capacity(steps);

        for _ in 0..steps {
            diff = self.phi * diff + self.theta * shock;
            shock = 0.0;
            level += diff;
            out.push(level);
        }
        out
    }

    pub fn phi(&self) -> f64 {
        self.phi
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Residual variance of the conditional fit
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_four_points() {
        let err = ArimaForecaster::fit(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            ForecastError::InsufficientHistory {
                required: 4,
                available: 3
            }
        );
        assert!(ArimaForecaster::fit(&[1.0, 2.0, 3.0, 4.0]).is_ok());
    }

    #[test]
    fn test_constant_series_forecasts_flat() {
        let model = ArimaForecaster::fit(&[5.0; 12]).unwrap();
        assert_eq!(model.phi(), 0.0);
        assert_eq!(model.theta(), 0.0);
        assert_eq!(model.forecast(6), vec![5.0; 6]);
    }

    #[test]
    fn test_linear_trend_is_extrapolated() {
        let series: Vec<f64> = (0..24).map(|i| 100.0 + 10.0 * i as f64).collect();
        let model = ArimaForecaster::fit(&series).unwrap();
        let forecast = model.forecast(6);

        assert_eq!(forecast.len(), 6);
        // constant differences favour phi near one
        assert!(model.phi() > 0.95);
        assert!(forecast[0] > 330.0 && forecast[0] <= 340.0 + 1e-9);
        assert!(forecast.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_coefficients_stay_in_region() {
        let series = vec![
            3.0, 8.0, 1.0, 9.0, 2.0, 7.0, 0.0, 10.0, 4.0, 6.0, 2.0, 9.0, 1.0, 8.0,
        ];
        let model = ArimaForecaster::fit(&series).unwrap();
        assert!(model.phi().abs() < 1.0);
        assert!(model.theta().abs() < 1.0);
        assert!(model.sigma2().is_finite());
        assert!(model.forecast(6).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_fit_is_deterministic() {
        let series = vec![12.0, 0.0, 40.0, 5.0, 0.0, 33.0, 18.0, 2.0, 0.0, 27.0];
        let a = ArimaForecaster::fit(&series).unwrap();
        let b = ArimaForecaster::fit(&series).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.forecast(6), b.forecast(6));
    }

    #[test]
    fn test_non_finite_series_rejected() {
        let result = ArimaForecaster::fit(&[1.0, f64::NAN, 2.0, 3.0]);
        assert!(matches!(result, Err(ForecastError::Model(_))));
    }
}
