use anyhow::{bail, Context};
use fireguard::{
    api::{build_router, AppState},
    config::{Config, ObservabilityConfig},
    data::prepare_dataset,
    ml::PredictionService,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    init_tracing(&config.observability);
    config.validate().context("invalid configuration")?;

    tracing::info!(
        service = %config.observability.service_name,
        "Starting FireGuard v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = fireguard::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("Prometheus metrics initialized");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    if config.data.prepare_on_start {
        let Some(raw_path) = config.data.raw_path.clone() else {
            bail!("data.prepare_on_start is set but data.raw_path is not");
        };
        let data = config.data.clone();
        tokio::task::spawn_blocking(move || {
            prepare_dataset(&raw_path, &data.prepared_path, &data.encoded_path)
        })
        .await?
        .context("dataset preparation failed")?;
    }

    let state = AppState::new(
        config.server.inference_timeout(),
        config.server.request_timeout(),
    );

    // Train every model before accepting traffic
    let encoded_path = config.data.encoded_path.clone();
    let training = config.training.clone();
    let forecasting = config.forecasting.clone();
    let service = tokio::task::spawn_blocking(move || {
        PredictionService::from_path(&encoded_path, &training, &forecasting)
    })
    .await?
    .with_context(|| {
        format!(
            "failed to train models from {}",
            config.data.encoded_path.display()
        )
    })?;

    state.install(Arc::new(service))?;
    tracing::info!("Prediction models installed");

    let app = build_router(state);

    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("failed to bind {}", http_addr))?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Training report: http://{}/models", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

fn init_tracing(observability: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("fireguard={},tower_http=info", observability.log_level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
