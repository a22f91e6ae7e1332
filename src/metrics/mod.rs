/// Prometheus metrics for the prediction service.
///
/// - HTTP request counts and latencies (via [`middleware::track_metrics`])
/// - Prediction outcomes per endpoint
/// - Startup training duration per stage
/// - Model readiness
///
/// # Example
/// ```no_run
/// use fireguard::metrics::HTTP_REQUESTS_TOTAL;
///
/// HTTP_REQUESTS_TOTAL
///     .with_label_values(&["GET", "/health", "200"])
///     .inc();
/// ```
pub mod middleware;

pub use middleware::track_metrics;

use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use prometheus::{
    CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
};

const NAMESPACE: &str = "fireguard";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Total number of HTTP requests received
    ///
    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace(NAMESPACE),
        &["method", "path", "status_code"]
    ).expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration in seconds
    ///
    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    /// Predictions served
    ///
    /// Labels: endpoint, outcome (success | error)
    pub static ref PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("predictions_total", "Total number of prediction requests")
            .namespace(NAMESPACE),
        &["endpoint", "outcome"]
    ).expect("Failed to create PREDICTIONS_TOTAL metric");

    /// Wall-clock time spent in each startup training stage
    ///
    /// Labels: stage (regression | classification | arima | lstm)
    pub static ref TRAINING_DURATION_SECONDS: GaugeVec = GaugeVec::new(
        Opts::new("training_duration_seconds", "Startup training duration in seconds")
            .namespace(NAMESPACE),
        &["stage"]
    ).expect("Failed to create TRAINING_DURATION_SECONDS metric");

    /// 1 once fitted models are installed
    pub static ref MODELS_READY: Gauge = Gauge::with_opts(
        Opts::new("models_ready", "Whether fitted models are installed")
            .namespace(NAMESPACE)
    ).expect("Failed to create MODELS_READY metric");
}

static REGISTERED: OnceCell<()> = OnceCell::new();

/// Register every metric with the global registry; later calls are no-ops
pub fn init_metrics() -> Result<(), prometheus::Error> {
    REGISTERED
        .get_or_try_init(|| {
            PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(PREDICTIONS_TOTAL.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(TRAINING_DURATION_SECONDS.clone()))?;
            PROMETHEUS_REGISTRY.register(Box::new(MODELS_READY.clone()))?;
            Ok(())
        })
        .map(|_| ())
}

pub fn record_prediction(endpoint: &str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    PREDICTIONS_TOTAL
        .with_label_values(&[endpoint, outcome])
        .inc();
}

pub fn record_training(stage: &str, seconds: f64) {
    TRAINING_DURATION_SECONDS
        .with_label_values(&[stage])
        .set(seconds);
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_prediction_counter() {
        record_prediction("predict-loss", true);
        let value = PREDICTIONS_TOTAL
            .with_label_values(&["predict-loss", "success"])
            .get();
        assert!(value >= 1.0);
    }

    #[test]
    fn test_gather_metrics() {
        init_metrics().unwrap();
        record_training("regression", 1.5);
        let metrics = gather_metrics();
        assert!(metrics.contains("fireguard_training_duration_seconds"));
    }
}
