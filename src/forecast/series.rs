//! Monthly aggregation of incident losses

use super::error::{ForecastError, ForecastResult};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Total loss per calendar month, contiguous from the first to the last
/// incident month. Months without incidents hold zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySeries {
    start: NaiveDate,
    values: Vec<f64>,
}

fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

fn month_start(index: i64) -> ForecastResult<NaiveDate> {
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    i32::try_from(year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, month, 1))
        .ok_or_else(|| ForecastError::Model(format!("month index {} out of range", index)))
}

impl MonthlySeries {
    /// Sum `losses` by the calendar month of the matching start date.
    pub fn from_incidents(start_dates: &[NaiveDate], losses: &[f64]) -> ForecastResult<Self> {
        if start_dates.len() != losses.len() {
            return Err(ForecastError::Model(format!(
                "{} start dates for {} loss values",
                start_dates.len(),
                losses.len()
            )));
        }
        if let Some(pos) = losses.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::Model(format!(
                "non-finite loss at incident {}",
                pos
            )));
        }

        let (first, last) = match (
            start_dates.iter().map(|d| month_index(*d)).min(),
            start_dates.iter().map(|d| month_index(*d)).max(),
        ) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(ForecastError::InsufficientHistory {
                    required: 1,
                    available: 0,
                })
            }
        };

        let mut values = vec![0.0; (last - first + 1) as usize];
        for (date, loss) in start_dates.iter().zip(losses) {
            values[(month_index(*date) - first) as usize] += loss;
        }

        Ok(Self {
            start: month_start(first)?,
            values,
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First day of the earliest month
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day of the latest month
    pub fn end(&self) -> ForecastResult<NaiveDate> {
        month_start(month_index(self.start) + self.values.len() as i64 - 1)
    }

    /// First days of the `steps` months following the series
    pub fn following_months(&self, steps: usize) -> ForecastResult<Vec<NaiveDate>> {
        let after = month_index(self.start) + self.values.len() as i64;
        (0..steps as i64).map(|i| month_start(after + i)).collect()
    }

    /// Largest monthly total
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_same_month_losses_are_summed() {
        let series = MonthlySeries::from_incidents(
            &[date(2020, 1, 5), date(2020, 1, 20)],
            &[100.0, 50.0],
        )
        .unwrap();

        assert_eq!(series.values(), &[150.0]);
        assert_eq!(series.start(), date(2020, 1, 1));
    }

    #[test]
    fn test_empty_months_are_zero_filled() {
        let series = MonthlySeries::from_incidents(
            &[date(2020, 1, 5), date(2020, 4, 2), date(2020, 1, 20)],
            &[100.0, 30.0, 50.0],
        )
        .unwrap();

        assert_eq!(series.values(), &[150.0, 0.0, 0.0, 30.0]);
        assert_eq!(series.end().unwrap(), date(2020, 4, 1));
        assert_eq!(series.max(), 150.0);
    }

    #[test]
    fn test_series_spans_year_boundary() {
        let series = MonthlySeries::from_incidents(
            &[date(2020, 11, 30), date(2021, 2, 1)],
            &[10.0, 20.0],
        )
        .unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.values(), &[10.0, 0.0, 0.0, 20.0]);
        assert_eq!(
            series.following_months(2).unwrap(),
            vec![date(2021, 3, 1), date(2021, 4, 1)]
        );
    }

    #[test]
    fn test_no_incidents_is_insufficient_history() {
        let result = MonthlySeries::from_incidents(&[], &[]);
        assert_eq!(
            result,
            Err(ForecastError::InsufficientHistory {
                required: 1,
                available: 0
            })
        );
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = MonthlySeries::from_incidents(&[date(2020, 1, 1)], &[1.0, 2.0]);
        assert!(matches!(result, Err(ForecastError::Model(_))));
    }
}
