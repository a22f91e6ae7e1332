pub mod handlers;
pub mod routes;

pub use handlers::{
    ArimaForecastResponse, FeaturePayload, HealthResponse, LossPrediction, LstmForecastResponse,
    MessageResponse, ReadinessResponse, SeverityResponse,
};
pub use routes::*;

use crate::error::{AppError, Result};
use crate::metrics;
use crate::ml::PredictionService;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared application state
///
/// The router can be built before training finishes; handlers answer
/// `ModelNotReady` until [`AppState::install`] succeeds.
#[derive(Clone)]
pub struct AppState {
    service: Arc<OnceCell<Arc<PredictionService>>>,
    pub inference_timeout: Duration,
    pub request_timeout: Duration,
    started_at: Instant,
}

impl AppState {
    pub fn new(inference_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            service: Arc::new(OnceCell::new()),
            inference_timeout,
            request_timeout,
            started_at: Instant::now(),
        }
    }

    /// State with models already installed
    pub fn with_service(mut self, service: Arc<PredictionService>) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(service);
        self.service = Arc::new(cell);
        metrics::MODELS_READY.set(1.0);
        self
    }

    /// Install fitted models. Fails if models were already installed.
    pub fn install(&self, service: Arc<PredictionService>) -> Result<()> {
        self.service
            .set(service)
            .map_err(|_| AppError::Internal("prediction models already installed".to_string()))?;
        metrics::MODELS_READY.set(1.0);
        Ok(())
    }

    pub fn service(&self) -> Result<Arc<PredictionService>> {
        self.service.get().cloned().ok_or(AppError::ModelNotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.service.get().is_some()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Run `infer` on the blocking pool, bounded by the inference timeout.
    ///
    /// The outcome is counted under `endpoint` in the prediction metrics.
    pub async fn run_inference<T, F>(&self, endpoint: &'static str, infer: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&PredictionService) -> Result<T> + Send + 'static,
    {
        let service = self.service()?;
        let task = tokio::task::spawn_blocking(move || infer(&service));

        let outcome = match tokio::time::timeout(self.inference_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(AppError::Internal(format!(
                "inference task failed: {}",
                join_error
            ))),
            Err(_) => Err(AppError::Timeout(format!(
                "{} inference exceeded {}ms",
                endpoint,
                self.inference_timeout.as_millis()
            ))),
        };

        metrics::record_prediction(endpoint, outcome.is_ok());
        outcome
    }
}
