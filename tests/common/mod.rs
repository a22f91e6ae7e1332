//! Shared fixtures for integration tests
//!
//! Builds a small synthetic raw incident CSV: 60 fires spread over the even
//! months of 2020-2021 (odd months have no incidents), imbalanced severities
//! 6-9, two categorical columns and a few unreported loss cells.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use fireguard::config::{ForecastingConfig, TrainingConfig};
use fireguard::data::{clean, encode, EncodedTable, RawTable};
use serde_json::{Map, Value};

pub const INCIDENTS: usize = 60;

const HEADER: [&str; 21] = [
    "FireID",
    "StartDate",
    "EndDate",
    "Region",
    "VegetationType",
    "AreaBurned_ha",
    "CropLoss_USD",
    "LivestockLoss_USD",
    "IrrigationDamage_USD",
    "RoadDamage_USD",
    "PowerLineDamage_USD",
    "BuildingDamage_USD",
    "TimberLoss_USD",
    "ReforestationCost_USD",
    "HealthCost_USD",
    "TourismRevenueLoss_USD",
    "ActualEconomicLoss_USD",
    "PredictedEconomicLoss_USD",
    "AidReceived_USD",
    "InsurancePayout_USD",
    "FireSeverityIndex",
];

const REGIONS: [&str; 3] = ["North", "Coastal", "Valley"];
const VEGETATION: [&str; 2] = ["Forest", "Grassland"];

/// Severity pattern per block of ten fires: five 6s, three 7s, one 8, one 9
pub fn severity_of(i: usize) -> i64 {
    match i % 10 {
        0..=4 => 6,
        5..=7 => 7,
        8 => 8,
        _ => 9,
    }
}

pub fn start_date_of(i: usize) -> NaiveDate {
    let month_index = (i * 2) % 24;
    let year = 2020 + (month_index / 12) as i32;
    let month = (month_index % 12) as u32 + 1;
    let day = 1 + ((i * 3) % 27) as u32;
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn record(i: usize) -> Vec<String> {
    let severity = severity_of(i) as f64;
    let scale = severity - 5.0;
    let wobble = ((i * 37) % 11) as f64;

    let area = 100.0 * scale + 7.0 * wobble;
    let crop = 1_000.0 * scale + 13.0 * wobble;
    let livestock = 500.0 * scale + 5.0 * wobble;
    let irrigation = 200.0 * scale;
    let road = 800.0 * scale + 3.0 * wobble;
    let power = 600.0 * scale;
    let building = 2_500.0 * scale + 41.0 * wobble;
    let timber = 1_200.0 * scale;
    let reforestation = 900.0 * scale;
    let health = 300.0 * scale + 2.0 * wobble;
    let tourism = 400.0 * scale;
    let actual = crop + livestock + irrigation + road + power + building + timber
        + reforestation
        + health
        + tourism;
    let predicted = actual * (0.9 + wobble / 100.0);
    let aid = 0.1 * actual;
    let insurance = 0.2 * actual;

    let start = start_date_of(i);
    let end = start + Duration::days(2 + (i % 5) as i64);

    let blank_if = |skip: bool, v: f64| if skip { String::new() } else { format!("{:.2}", v) };

    vec![
        format!("F{:03}", i + 1),
        start.format("%d-%m-%Y").to_string(),
        end.format("%d-%m-%Y").to_string(),
        REGIONS[i % REGIONS.len()].to_string(),
        VEGETATION[(i / 3) % VEGETATION.len()].to_string(),
        format!("{:.1}", area),
        format!("{:.2}", crop),
        format!("{:.2}", livestock),
        // unreported irrigation damage counts as zero; the total above keeps it
        blank_if(i % 7 == 0, irrigation),
        format!("{:.2}", road),
        format!("{:.2}", power),
        format!("{:.2}", building),
        format!("{:.2}", timber),
        format!("{:.2}", reforestation),
        format!("{:.2}", health),
        blank_if(i % 9 == 0, tourism),
        format!("{:.2}", actual),
        format!("{:.2}", predicted),
        format!("{:.2}", aid),
        blank_if(i % 4 == 0, insurance),
        format!("{}", severity),
    ]
}

/// Raw CSV text for the synthetic dataset
pub fn raw_csv() -> String {
    let mut out = HEADER.join(",");
    out.push('\n');
    for i in 0..INCIDENTS {
        out.push_str(&record(i).join(","));
        out.push('\n');
    }
    out
}

pub fn raw_table() -> RawTable {
    RawTable::from_reader(raw_csv().as_bytes()).expect("synthetic raw table")
}

pub fn encoded_table() -> EncodedTable {
    let prepared = clean(&raw_table()).expect("clean synthetic table");
    encode(&prepared).expect("encode synthetic table")
}

/// Training parameters small enough to keep integration tests quick
pub fn fast_training() -> TrainingConfig {
    TrainingConfig {
        n_estimators: 15,
        random_forest_trees: 8,
        ..TrainingConfig::default()
    }
}

pub fn fast_forecasting() -> ForecastingConfig {
    ForecastingConfig {
        lstm_units: 8,
        lstm_epochs: 10,
        ..ForecastingConfig::default()
    }
}

/// Feature payload for row `row` of the encoded table, keyed by schema column
pub fn features_for_row(table: &EncodedTable, row: usize) -> Map<String, Value> {
    let schema = table.schema();
    let mut features = Map::new();
    for name in schema.columns() {
        let idx = table.column_index(name).expect("schema column in table");
        features.insert(name.clone(), Value::from(table.values[[row, idx]]));
    }
    features
}
