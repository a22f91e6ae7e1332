use crate::config::{ForecastingConfig, TrainingConfig};
use crate::data::{columns, round_to, EncodedTable, FeatureSchema};
use crate::error::{AppError, Result};
use crate::forecast::{
    flag_implausible, ArimaForecaster, ForecastError, LstmForecaster, LstmParams, MonthlySeries,
    FORECAST_HORIZON,
};
use crate::metrics;
use crate::ml::classifier::{SeverityClassifier, SeverityPrediction};
use crate::ml::models::{ForecastSummary, TrainingReport};
use crate::ml::regression::{train_regressors, Regressor};
use ndarray::Array2;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Decimal places of a single-incident loss prediction
pub const LOSS_DECIMALS: u32 = 2;

/// Every fitted artifact the API serves from.
///
/// Built once, never mutated afterwards; share it behind an `Arc`.
#[derive(Debug)]
pub struct PredictionService {
    schema: FeatureSchema,
    regressor: Box<dyn Regressor>,
    classifier: SeverityClassifier,
    series: MonthlySeries,
    arima: std::result::Result<ArimaForecaster, ForecastError>,
    lstm: std::result::Result<LstmForecaster, ForecastError>,
    forecasting: ForecastingConfig,
    report: TrainingReport,
}

impl PredictionService {
    /// Load the encoded table from disk and train
    pub fn from_path(
        path: &Path,
        training: &TrainingConfig,
        forecasting: &ForecastingConfig,
    ) -> Result<Self> {
        let table = EncodedTable::from_path(path)?;
        Self::train(&table, training, forecasting)
    }

    /// Fit regressors, the severity classifier and both forecasters.
    ///
    /// Data and regression/classification failures abort. A forecaster that
    /// cannot be fitted is kept as an error and reported on each request.
    pub fn train(
        table: &EncodedTable,
        training: &TrainingConfig,
        forecasting: &ForecastingConfig,
    ) -> Result<Self> {
        let schema = table.schema();
        let features = table.features(&schema)?;
        let loss = table.column(columns::ACTUAL_LOSS)?;
        let severity = table.column(columns::SEVERITY_INDEX)?;

        info!(
            rows = table.n_rows(),
            features = schema.len(),
            "Training prediction models"
        );

        let started = Instant::now();
        let regression = train_regressors(&features, &loss, training)?;
        metrics::record_training("regression", started.elapsed().as_secs_f64());

        let started = Instant::now();
        let (classifier, classification) = SeverityClassifier::train(&features, &severity, training)?;
        metrics::record_training("classification", started.elapsed().as_secs_f64());

        let series = MonthlySeries::from_incidents(&table.start_dates, &loss.to_vec())?;
        info!(
            months = series.len(),
            first = %series.start(),
            "Built monthly loss series"
        );

        let started = Instant::now();
        let arima = ArimaForecaster::fit(series.values());
        metrics::record_training("arima", started.elapsed().as_secs_f64());
        match &arima {
            Ok(model) => info!(
                phi = model.phi(),
                theta = model.theta(),
                sigma2 = model.sigma2(),
                "ARIMA(1,1,1) fitted"
            ),
            Err(e) => warn!(error = %e, "ARIMA forecaster unavailable"),
        }

        let started = Instant::now();
        let lstm = LstmForecaster::fit(series.values(), LstmParams::from(forecasting));
        metrics::record_training("lstm", started.elapsed().as_secs_f64());
        match &lstm {
            Ok(model) => info!(final_loss = model.final_loss(), "LSTM forecaster fitted"),
            Err(e) => warn!(error = %e, "LSTM forecaster unavailable"),
        }

        let forecast_summary = ForecastSummary {
            months: series.len(),
            first_month: Some(series.start().format("%Y-%m").to_string()),
            last_month: series.end().ok().map(|d| d.format("%Y-%m").to_string()),
            forecast_months: series
                .following_months(FORECAST_HORIZON)?
                .iter()
                .map(|d| d.format("%Y-%m").to_string())
                .collect(),
            historical_max: series.max(),
            arima_error: arima.as_ref().err().map(|e| e.to_string()),
            lstm_error: lstm.as_ref().err().map(|e| e.to_string()),
            arima_sigma2: arima.as_ref().ok().map(|m| m.sigma2()),
            lstm_final_loss: lstm.as_ref().ok().map(|m| m.final_loss()),
        };

        let report = TrainingReport {
            trained_at: chrono::Utc::now(),
            rows: table.n_rows(),
            features: schema.len(),
            regression: regression.report,
            classification,
            forecasting: forecast_summary,
        };

        let service = Self {
            schema,
            regressor: regression.model,
            classifier,
            series,
            arima,
            lstm,
            forecasting: forecasting.clone(),
            report,
        };

        // flag implausible forecasts once at startup
        if let Ok(values) = service.arima_forecast_raw() {
            flag_implausible("arima", &values, service.series.max(), forecasting.sanity_factor);
        }
        if let Ok(values) = service.lstm_forecast_raw() {
            flag_implausible("lstm", &values, service.series.max(), forecasting.sanity_factor);
        }

        Ok(service)
    }

    fn vectorize(&self, features: &Map<String, Value>) -> Result<Vec<f64>> {
        self.schema
            .vectorize(features)
            .map_err(|mismatch| AppError::SchemaMismatch(mismatch.to_string()))
    }

    /// Economic loss for one incident, rounded to cents
    pub fn predict_loss(&self, features: &Map<String, Value>) -> Result<f64> {
        let row = self.vectorize(features)?;
        let matrix = Array2::from_shape_vec((1, row.len()), row)
            .map_err(|e| AppError::Internal(format!("feature row shape: {}", e)))?;

        let prediction = self
            .regressor
            .predict(&matrix)?
            .first()
            .copied()
            .ok_or_else(|| AppError::Internal("regressor returned no prediction".to_string()))?;

        if !prediction.is_finite() {
            return Err(AppError::Internal(
                "regressor produced a non-finite prediction".to_string(),
            ));
        }
        Ok(round_to(prediction, LOSS_DECIMALS))
    }

    /// Severity class and response tier for one incident
    pub fn predict_severity(&self, features: &Map<String, Value>) -> Result<SeverityPrediction> {
        let row = self.vectorize(features)?;
        self.classifier.predict(&row)
    }

    fn arima_forecast_raw(&self) -> std::result::Result<Vec<f64>, ForecastError> {
        let model = self.arima.as_ref().map_err(Clone::clone)?;
        Ok(model.forecast(FORECAST_HORIZON))
    }

    fn lstm_forecast_raw(&self) -> std::result::Result<Vec<f64>, ForecastError> {
        let model = self.lstm.as_ref().map_err(Clone::clone)?;
        model.forecast(FORECAST_HORIZON)
    }

    fn rounded(&self, values: Vec<f64>) -> Vec<f64> {
        values
            .into_iter()
            .map(|v| round_to(v, self.forecasting.round_decimals))
            .collect()
    }

    /// Next six monthly totals from ARIMA(1,1,1)
    pub fn forecast_arima(&self) -> Result<Vec<f64>> {
        Ok(self.rounded(self.arima_forecast_raw()?))
    }

    /// Next six monthly totals from the LSTM
    pub fn forecast_lstm(&self) -> Result<Vec<f64>> {
        Ok(self.rounded(self.lstm_forecast_raw()?))
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn series(&self) -> &MonthlySeries {
        &self.series
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }
}
