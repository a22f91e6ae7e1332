//! HTTP client tests against a mock server

use fireguard::client::{ClientError, FireguardClient};
use fireguard::ml::ResponseTier;
use serde_json::{json, Map};

fn features() -> Map<String, serde_json::Value> {
    let mut features = Map::new();
    features.insert("CropLoss_USD".to_string(), json!(1200.0));
    features.insert("Region_North".to_string(), json!(1));
    features
}

#[tokio::test]
async fn test_predict_loss_posts_features() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/predict-loss")
        .match_header("content-type", "application/json")
        .match_body(mockito::Matcher::Json(json!({ "features": features() })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"predicted_economic_loss_usd": 123456.78}"#)
        .create_async()
        .await;

    let client = FireguardClient::new(server.url()).unwrap();
    let prediction = client.predict_loss(features()).await.unwrap();

    assert_eq!(prediction.predicted_economic_loss_usd, 123456.78);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_predict_fsi_decodes_tier() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/predict-fsi")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"predicted_fsi": 7, "suggested_response": "Moderate Response Team"}"#)
        .create_async()
        .await;

    let client = FireguardClient::new(server.url()).unwrap();
    let response = client.predict_fsi(features()).await.unwrap();

    assert_eq!(response.predicted_fsi, 7);
    assert_eq!(response.suggested_response, ResponseTier::ModerateResponse);
}

#[tokio::test]
async fn test_forecasts() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/forecast-loss-arima")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"forecast_next_6_months_usd": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/forecast-loss-lstm")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"forecast": [6.5, 5.5, 4.5, 3.5, 2.5, 1.5]}"#)
        .create_async()
        .await;

    let client = FireguardClient::new(server.url()).unwrap();
    let arima = client.forecast_arima().await.unwrap();
    let lstm = client.forecast_lstm().await.unwrap();

    assert_eq!(arima.forecast_next_6_months_usd.len(), 6);
    assert_eq!(lstm.forecast[0], 6.5);
}

#[tokio::test]
async fn test_error_envelope_becomes_api_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/predict-loss")
        .with_status(422)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"error": {"code": "SCHEMA_MISMATCH", "message": "Schema mismatch: missing features: A", "status": 422}}"#,
        )
        .create_async()
        .await;

    let client = FireguardClient::new(server.url()).unwrap();
    match client.predict_loss(Map::new()).await.unwrap_err() {
        ClientError::Api {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 422);
            assert_eq!(code, "SCHEMA_MISMATCH");
            assert!(message.contains("missing features"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_health() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "healthy", "version": "0.1.0", "uptime_seconds": 12}"#)
        .create_async()
        .await;

    let client = FireguardClient::new(format!("{}/", server.url())).unwrap();
    let health = client.health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.uptime_seconds, 12);
}
