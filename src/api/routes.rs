use crate::api::{handlers, AppState};
use crate::error::AppError;
use crate::metrics::track_metrics;
use axum::{
    error_handling::HandleErrorLayer,
    middleware,
    routing::{get, post},
    BoxError, Router,
};
use std::time::Duration;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    let request_timeout = state.request_timeout;

    let router = Router::new()
        .route("/", get(handlers::root))
        // Predictions
        .route("/predict-loss", post(handlers::predict_loss))
        .route("/predict-fsi", post(handlers::predict_fsi))
        .route("/forecast-loss-arima", get(handlers::forecast_loss_arima))
        .route("/forecast-loss-lstm", get(handlers::forecast_loss_lstm))
        // Operations
        .route("/health", get(handlers::health_check))
        .route("/health/ready", get(handlers::readiness))
        .route("/models", get(handlers::models))
        .route("/metrics", get(handlers::metrics_handler))
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        );

    with_request_timeout(router, request_timeout).layer(CorsLayer::permissive())
}

/// Bound every request by `timeout`, answering with the JSON error envelope
pub(crate) fn with_request_timeout(router: Router, timeout: Duration) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(|err: BoxError| async move {
                middleware_error(err)
            }))
            .layer(TimeoutLayer::new(timeout)),
    )
}

fn middleware_error(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        AppError::Timeout("request exceeded the server timeout".to_string())
    } else {
        AppError::Internal(format!("unhandled middleware error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_request_timeout_uses_error_envelope() {
        let slow = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                "done"
            }),
        );
        let app = with_request_timeout(slow, Duration::from_millis(20));

        let response = app
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"]["code"], "TIMEOUT");
        assert_eq!(value["error"]["status"], 504);
    }

    #[tokio::test]
    async fn test_fast_request_passes_through() {
        let fast = Router::new().route("/fast", get(|| async { "ok" }));
        let app = with_request_timeout(fast, Duration::from_secs(5));

        let response = app
            .oneshot(Request::builder().uri("/fast").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_non_timeout_errors_are_internal() {
        let err = middleware_error(BoxError::from("boom"));
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}
