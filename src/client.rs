//! HTTP client for a running prediction service

use crate::api::{
    ArimaForecastResponse, FeaturePayload, HealthResponse, LossPrediction, LstmForecastResponse,
    MessageResponse, SeverityResponse,
};
use crate::ml::TrainingReport;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with an error body
    #[error("{code} ({status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Typed wrapper over the service's JSON endpoints
#[derive(Debug, Clone)]
pub struct FireguardClient {
    http: reqwest::Client,
    endpoint: String,
}

impl FireguardClient {
    pub fn new(endpoint: impl Into<String>) -> ClientResult<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.http.get(self.url(path)).send().await?;
        decode(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<T> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        decode(response).await
    }

    pub async fn root(&self) -> ClientResult<MessageResponse> {
        self.get("/").await
    }

    pub async fn predict_loss(&self, features: Map<String, Value>) -> ClientResult<LossPrediction> {
        let payload = FeaturePayload {
            features: Some(features),
        };
        self.post("/predict-loss", &payload).await
    }

    pub async fn predict_fsi(&self, features: Map<String, Value>) -> ClientResult<SeverityResponse> {
        let payload = FeaturePayload {
            features: Some(features),
        };
        self.post("/predict-fsi", &payload).await
    }

    pub async fn forecast_arima(&self) -> ClientResult<ArimaForecastResponse> {
        self.get("/forecast-loss-arima").await
    }

    pub async fn forecast_lstm(&self) -> ClientResult<LstmForecastResponse> {
        self.get("/forecast-loss-lstm").await
    }

    pub async fn health(&self) -> ClientResult<HealthResponse> {
        self.get("/health").await
    }

    pub async fn models(&self) -> ClientResult<TrainingReport> {
        self.get("/models").await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await?;
    Err(api_error(status, &text))
}

fn api_error(status: StatusCode, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ClientError::Api {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => ClientError::Api {
            status: status.as_u16(),
            code: status
                .canonical_reason()
                .unwrap_or("UNKNOWN")
                .to_uppercase()
                .replace(' ', "_"),
            message: body.to_string(),
        },
    }
}
