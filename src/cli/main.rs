use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use fireguard::{
    client::FireguardClient,
    config::Config,
    data::prepare_dataset,
    ml::{PredictionService, TrainingReport},
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fireguard-cli")]
#[command(about = "FireGuard wildfire prediction CLI", long_about = None)]
struct Cli {
    #[arg(short, long, env = "FIREGUARD_ENDPOINT", default_value = "http://localhost:8000")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean and encode a raw incident CSV
    Prepare {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        prepared: Option<PathBuf>,

        #[arg(short = 'E', long)]
        encoded: Option<PathBuf>,
    },

    /// Train every model offline and print the training report
    Evaluate {
        #[arg(short = 'E', long)]
        encoded: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Predict economic loss for one incident
    PredictLoss {
        /// JSON file holding a features object
        #[arg(short, long)]
        features: PathBuf,
    },

    /// Predict fire severity index and response tier
    PredictFsi {
        #[arg(short, long)]
        features: PathBuf,
    },

    /// Six-month ARIMA loss forecast
    ForecastArima,

    /// Six-month LSTM loss forecast
    ForecastLstm,

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Prepare {
            input,
            prepared,
            encoded,
        } => {
            let config = load_config();
            let prepared = prepared.unwrap_or(config.data.prepared_path);
            let encoded = encoded.unwrap_or(config.data.encoded_path);

            let summary = prepare_dataset(&input, &prepared, &encoded)
                .with_context(|| format!("failed to prepare {}", input.display()))?;
            print_json(&summary)?;
            println!("Prepared table: {}", prepared.display());
            println!("Encoded table:  {}", encoded.display());
        }

        Commands::Evaluate { encoded, json } => {
            let config = load_config();
            config.validate()?;
            let encoded = encoded.unwrap_or(config.data.encoded_path.clone());

            let training = config.training.clone();
            let forecasting = config.forecasting.clone();
            let service = tokio::task::spawn_blocking(move || {
                PredictionService::from_path(&encoded, &training, &forecasting)
            })
            .await??;

            if json {
                print_json(service.report())?;
            } else {
                print_report(service.report());
            }

            match service.forecast_arima() {
                Ok(forecast) => println!("ARIMA(1,1,1) forecast: {:?}", forecast),
                Err(e) => println!("ARIMA(1,1,1) forecast unavailable: {}", e),
            }
            match service.forecast_lstm() {
                Ok(forecast) => println!("LSTM forecast:         {:?}", forecast),
                Err(e) => println!("LSTM forecast unavailable: {}", e),
            }
        }

        Commands::PredictLoss { features } => {
            let client = FireguardClient::new(&cli.endpoint)?;
            let response = client.predict_loss(read_features(&features)?).await?;
            print_json(&response)?;
        }

        Commands::PredictFsi { features } => {
            let client = FireguardClient::new(&cli.endpoint)?;
            let response = client.predict_fsi(read_features(&features)?).await?;
            print_json(&response)?;
        }

        Commands::ForecastArima => {
            let client = FireguardClient::new(&cli.endpoint)?;
            print_json(&client.forecast_arima().await?)?;
        }

        Commands::ForecastLstm => {
            let client = FireguardClient::new(&cli.endpoint)?;
            print_json(&client.forecast_lstm().await?)?;
        }

        Commands::Health => {
            let client = FireguardClient::new(&cli.endpoint)?;
            print_json(&client.health().await?)?;
        }
    }

    Ok(())
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Accepts either `{"features": {...}}` or the bare features object
fn read_features(path: &Path) -> anyhow::Result<Map<String, Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    match value {
        Value::Object(mut object) => match object.remove("features") {
            Some(Value::Object(features)) => Ok(features),
            Some(_) => bail!("\"features\" in {} must be an object", path.display()),
            None => Ok(object),
        },
        _ => bail!("{} must contain a JSON object", path.display()),
    }
}

fn print_report(report: &TrainingReport) {
    println!("Trained on {} rows, {} features", report.rows, report.features);
    println!();

    let regression = &report.regression;
    println!(
        "Regression (train {}, test {}), production model: {}",
        regression.split.train, regression.split.test, regression.production
    );
    for candidate in &regression.candidates {
        match (&candidate.metrics, &candidate.error) {
            (Some(m), _) => println!(
                "  {:<24} MSE {:>16.2}  RMSE {:>12.2}  MAE {:>12.2}  R2 {:>7.4}",
                candidate.kind.to_string(),
                m.mse,
                m.rmse,
                m.mae,
                m.r2
            ),
            (None, Some(e)) => println!("  {:<24} failed: {}", candidate.kind.to_string(), e),
            (None, None) => println!("  {:<24} no result", candidate.kind.to_string()),
        }
    }
    if let Some(best) = regression.best_by_r2 {
        println!("  Best by R2: {}", best);
    }
    println!();

    let classification = &report.classification;
    println!(
        "Severity classification: classes {:?}, {} rows after SMOTE",
        classification.classes, classification.balanced_rows
    );
    let summary = &classification.report;
    println!(
        "  accuracy {:.4}  macro precision {:.4}  macro recall {:.4}  macro F1 {:.4}",
        summary.accuracy, summary.macro_precision, summary.macro_recall, summary.macro_f1
    );
    for (class, m) in &summary.per_class {
        println!(
            "  FSI {:>3}: precision {:.4}  recall {:.4}  F1 {:.4}  support {}",
            class, m.precision, m.recall, m.f1_score, m.support
        );
    }
    println!("  Sample tier allocation:");
    for allocation in &classification.sample_allocations {
        println!(
            "    FSI {:>3} -> {}",
            allocation.predicted_fsi, allocation.suggested_response
        );
    }
    println!();

    let forecasting = &report.forecasting;
    println!(
        "Monthly series: {} months ({} to {}), max {:.2}",
        forecasting.months,
        forecasting.first_month.as_deref().unwrap_or("-"),
        forecasting.last_month.as_deref().unwrap_or("-"),
        forecasting.historical_max
    );
    println!("Forecast horizon: {}", forecasting.forecast_months.join(", "));
}
