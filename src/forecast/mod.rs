//! Monthly economic-loss forecasting
//!
//! Two independent forecasters run over the same zero-filled monthly series:
//! - ARIMA(1,1,1) fitted by conditional sum of squares
//! - A window-3 LSTM trained with Adam on the min-max scaled series

pub mod arima;
pub mod error;
pub mod lstm;
pub mod scaler;
pub mod series;
pub mod window;

pub use arima::{ArimaForecaster, ARIMA_MIN_POINTS};
pub use error::{ForecastError, ForecastResult};
pub use lstm::{LstmForecaster, LstmParams, LSTM_WINDOW};
pub use scaler::MinMaxScaler;
pub use series::MonthlySeries;
pub use window::RollingWindow;

use tracing::warn;

/// Months forecast by both endpoints
pub const FORECAST_HORIZON: usize = 6;

/// Indices of forecast values above `factor` times the historical monthly max.
///
/// Flagged values are logged; they are still returned to callers.
pub fn flag_implausible(model: &str, forecast: &[f64], historical_max: f64, factor: f64) -> Vec<usize> {
    let bound = historical_max * factor;
    let flagged: Vec<usize> = forecast
        .iter()
        .enumerate()
        .filter(|(_, v)| **v > bound)
        .map(|(i, _)| i)
        .collect();

    for &i in &flagged {
        warn!(
            model,
            step = i + 1,
            value = forecast[i],
            bound,
            "Forecast exceeds plausibility bound"
        );
    }
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_implausible() {
        let flagged = flag_implausible("arima", &[5.0, 101.0, 99.0, 250.0], 10.0, 10.0);
        assert_eq!(flagged, vec![1, 3]);
    }

    #[test]
    fn test_nothing_flagged_within_bound() {
        assert!(flag_implausible("lstm", &[1.0, 2.0], 10.0, 10.0).is_empty());
    }
}
