use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::metrics::gather_metrics;
use crate::ml::{ResponseTier, TrainingReport};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ROOT_MESSAGE: &str = "Wildfire Economic and Severity Prediction API";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Request body of both prediction endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturePayload {
    pub features: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossPrediction {
    pub predicted_economic_loss_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityResponse {
    pub predicted_fsi: i64,
    pub suggested_response: ResponseTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArimaForecastResponse {
    pub forecast_next_6_months_usd: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmForecastResponse {
    pub forecast: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
}

fn features_of(payload: std::result::Result<Json<FeaturePayload>, JsonRejection>) -> Result<Map<String, Value>> {
    let Json(payload) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    payload
        .features
        .ok_or_else(|| AppError::SchemaMismatch("request body has no features object".to_string()))
}

/// Service banner
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: ROOT_MESSAGE.to_string(),
    })
}

/// Predict economic loss with the production regressor
pub async fn predict_loss(
    State(state): State<AppState>,
    payload: std::result::Result<Json<FeaturePayload>, JsonRejection>,
) -> Result<Json<LossPrediction>> {
    let features = features_of(payload)?;
    let predicted = state
        .run_inference("predict-loss", move |service| service.predict_loss(&features))
        .await?;

    Ok(Json(LossPrediction {
        predicted_economic_loss_usd: predicted,
    }))
}

/// Predict fire severity index and the matching response tier
pub async fn predict_fsi(
    State(state): State<AppState>,
    payload: std::result::Result<Json<FeaturePayload>, JsonRejection>,
) -> Result<Json<SeverityResponse>> {
    let features = features_of(payload)?;
    let prediction = state
        .run_inference("predict-fsi", move |service| service.predict_severity(&features))
        .await?;

    Ok(Json(SeverityResponse {
        predicted_fsi: prediction.severity,
        suggested_response: prediction.response,
    }))
}

pub async fn forecast_loss_arima(
    State(state): State<AppState>,
) -> Result<Json<ArimaForecastResponse>> {
    let forecast = state
        .run_inference("forecast-loss-arima", |service| service.forecast_arima())
        .await?;

    Ok(Json(ArimaForecastResponse {
        forecast_next_6_months_usd: forecast,
    }))
}

pub async fn forecast_loss_lstm(
    State(state): State<AppState>,
) -> Result<Json<LstmForecastResponse>> {
    let forecast = state
        .run_inference("forecast-loss-lstm", |service| service.forecast_lstm())
        .await?;

    Ok(Json(LstmForecastResponse { forecast }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime().as_secs(),
    })
}

/// 200 once models are installed, 503 before
pub async fn readiness(State(state): State<AppState>) -> Result<Json<ReadinessResponse>> {
    if !state.is_ready() {
        return Err(AppError::ModelNotReady);
    }
    Ok(Json(ReadinessResponse {
        status: "ready".to_string(),
    }))
}

/// Training report of the installed models
pub async fn models(State(state): State<AppState>) -> Result<Json<TrainingReport>> {
    let service = state.service()?;
    Ok(Json(service.report().clone()))
}

/// Prometheus text exposition
pub async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}
