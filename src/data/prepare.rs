//! Raw incident table → cleaned table → one-hot encoded table.

use crate::data::columns::*;
use crate::data::error::{DataError, DataResult};
use crate::data::table::{parse_date_cell, parse_number, EncodedTable, RawTable};
use chrono::NaiveDate;
use ndarray::Array2;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// How a cleaned column is typed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Identifier,
    Date,
    Numeric,
    Categorical,
}

/// A cleaned cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Date(NaiveDate),
    Text(String),
    Empty,
}

impl Cell {
    fn as_number(&self) -> f64 {
        match self {
            Cell::Number(v) => *v,
            _ => 0.0,
        }
    }

    fn render(&self) -> String {
        match self {
            Cell::Number(v) => v.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Empty => String::new(),
        }
    }
}

/// Cleaned incident table with engineered columns appended
#[derive(Debug, Clone)]
pub struct PreparedTable {
    pub columns: Vec<String>,
    pub kinds: Vec<ColumnKind>,
    pub rows: Vec<Vec<Cell>>,
}

impl PreparedTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn categorical_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.kinds)
            .filter(|(_, kind)| **kind == ColumnKind::Categorical)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> DataResult<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Cell::render))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Loss distribution over the cleaned table
#[derive(Debug, Clone, Serialize)]
pub struct LossDistribution {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl LossDistribution {
    fn from_data(data: &[f64]) -> Self {
        let count = data.len();
        if count == 0 {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                median: 0.0,
                std_dev: 0.0,
            };
        }

        let mean = data.iter().sum::<f64>() / count as f64;
        let mut sorted = data.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let median = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;

        Self {
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            median,
            std_dev: variance.sqrt(),
        }
    }
}

/// What a preparation run produced
#[derive(Debug, Clone, Serialize)]
pub struct PreparationSummary {
    pub rows: usize,
    pub categorical_columns: Vec<String>,
    pub encoded_columns: usize,
    pub loss: LossDistribution,
}

/// Sum of agricultural loss components.
pub fn total_agri_loss(crop: f64, livestock: f64, irrigation: f64) -> f64 {
    crop + livestock + irrigation
}

/// Sum of infrastructure loss components.
pub fn infra_loss(road: f64, power_line: f64, building: f64, timber: f64) -> f64 {
    road + power_line + building + timber
}

pub fn environmental_cost(reforestation: f64, health: f64) -> f64 {
    reforestation + health
}

pub fn loss_deviation(actual: f64, predicted: f64) -> f64 {
    actual - predicted
}

/// (aid + insurance) / actual loss, rounded to 2 decimals.
///
/// Zero actual loss has no meaningful ratio and is reported as an error
/// instead of producing infinity or NaN.
pub fn support_ratio(fire_id: &str, aid: f64, insurance: f64, actual: f64) -> DataResult<f64> {
    if actual == 0.0 {
        return Err(DataError::UndefinedSupportRatio {
            fire_id: fire_id.to_string(),
        });
    }
    Ok(round_to((aid + insurance) / actual, 2))
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Clean a raw table: type columns, zero-fill loss columns, parse dates and
/// append the engineered columns.
pub fn clean(raw: &RawTable) -> DataResult<PreparedTable> {
    raw.require_columns(&required_columns())?;

    let kinds: Vec<ColumnKind> = raw
        .headers
        .iter()
        .enumerate()
        .map(|(idx, name)| classify_column(raw, idx, name))
        .collect();

    let mut rows = Vec::with_capacity(raw.rows.len());
    for (i, raw_row) in raw.rows.iter().enumerate() {
        let row_no = i + 1;
        let mut row = Vec::with_capacity(raw.headers.len() + ENGINEERED_COLUMNS.len());

        for ((name, kind), value) in raw.headers.iter().zip(&kinds).zip(raw_row) {
            let cell = match kind {
                ColumnKind::Identifier => Cell::Text(value.clone()),
                ColumnKind::Date => Cell::Date(parse_date_cell(row_no, name, value)?),
                ColumnKind::Categorical if value.is_empty() => Cell::Empty,
                ColumnKind::Categorical => Cell::Text(value.clone()),
                ColumnKind::Numeric => numeric_cell(row_no, name, value)?,
            };
            row.push(cell);
        }
        rows.push(row);
    }

    let mut table = PreparedTable {
        columns: raw.headers.clone(),
        kinds,
        rows,
    };

    // Required columns cannot be categorical: they feed arithmetic below.
    for name in ENGINEERING_INPUTS.iter().chain([&TOURISM_REVENUE_LOSS]) {
        let idx = table.column_index(name).unwrap_or_default();
        if table.kinds[idx] == ColumnKind::Categorical {
            let (row, value) = first_non_numeric(raw, idx);
            return Err(DataError::InvalidNumber {
                row,
                column: name.to_string(),
                value,
            });
        }
    }

    engineer_features(&mut table)?;
    Ok(table)
}

fn classify_column(raw: &RawTable, idx: usize, name: &str) -> ColumnKind {
    match name {
        FIRE_ID => ColumnKind::Identifier,
        START_DATE | END_DATE => ColumnKind::Date,
        _ if raw
            .rows
            .iter()
            .all(|row| row[idx].is_empty() || parse_number(&row[idx]).is_some()) =>
        {
            ColumnKind::Numeric
        }
        _ => ColumnKind::Categorical,
    }
}

fn first_non_numeric(raw: &RawTable, idx: usize) -> (usize, String) {
    raw.rows
        .iter()
        .enumerate()
        .find(|(_, row)| !row[idx].is_empty() && parse_number(&row[idx]).is_none())
        .map(|(i, row)| (i + 1, row[idx].clone()))
        .unwrap_or_default()
}

fn numeric_cell(row: usize, name: &str, value: &str) -> DataResult<Cell> {
    if value.is_empty() {
        if ZERO_FILL_COLUMNS.contains(&name) {
            return Ok(Cell::Number(0.0));
        }
        return Err(DataError::MissingValue {
            row,
            column: name.to_string(),
        });
    }
    parse_number(value)
        .map(Cell::Number)
        .ok_or_else(|| DataError::InvalidNumber {
            row,
            column: name.to_string(),
            value: value.to_string(),
        })
}

/// Append engineered columns. Order matters: the support ratio reads the
/// loss column only after every aggregate has been derived.
fn engineer_features(table: &mut PreparedTable) -> DataResult<()> {
    let idx = |name: &str| table.column_index(name).unwrap_or_default();
    let (id, crop, livestock, irrigation) =
        (idx(FIRE_ID), idx(CROP_LOSS), idx(LIVESTOCK_LOSS), idx(IRRIGATION_DAMAGE));
    let (road, power, building, timber) = (
        idx(ROAD_DAMAGE),
        idx(POWER_LINE_DAMAGE),
        idx(BUILDING_DAMAGE),
        idx(TIMBER_LOSS),
    );
    let (reforestation, health) = (idx(REFORESTATION_COST), idx(HEALTH_COST));
    let (actual, predicted, aid, insurance) = (
        idx(ACTUAL_LOSS),
        idx(PREDICTED_LOSS),
        idx(AID_RECEIVED),
        idx(INSURANCE_PAYOUT),
    );

    for row in table.rows.iter_mut() {
        let n = |i: usize| row[i].as_number();
        let fire_id = row[id].render();

        let agri = total_agri_loss(n(crop), n(livestock), n(irrigation));
        let infra = infra_loss(n(road), n(power), n(building), n(timber));
        let environmental = environmental_cost(n(reforestation), n(health));
        let deviation = loss_deviation(n(actual), n(predicted));
        let ratio = support_ratio(&fire_id, n(aid), n(insurance), n(actual))?;

        row.extend([agri, infra, environmental, deviation, ratio].map(Cell::Number));
    }

    for name in ENGINEERED_COLUMNS {
        table.columns.push(name.to_string());
        table.kinds.push(ColumnKind::Numeric);
    }
    Ok(())
}

/// One-hot encode every categorical column.
///
/// Numeric columns keep their order; indicator columns follow, grouped by
/// source column in table order with categories sorted lexicographically.
pub fn encode(table: &PreparedTable) -> DataResult<EncodedTable> {
    let n_rows = table.rows.len();
    let id_idx = table.column_index(FIRE_ID).unwrap_or_default();
    let start_idx = table.column_index(START_DATE).unwrap_or_default();
    let end_idx = table.column_index(END_DATE).unwrap_or_default();

    let numeric: Vec<usize> = (0..table.columns.len())
        .filter(|&i| table.kinds[i] == ColumnKind::Numeric)
        .collect();

    let mut indicator_sources: Vec<(usize, String)> = Vec::new();
    for (i, kind) in table.kinds.iter().enumerate() {
        if *kind != ColumnKind::Categorical {
            continue;
        }
        let categories: BTreeSet<&str> = table
            .rows
            .iter()
            .filter_map(|row| match &row[i] {
                Cell::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        debug!(
            column = %table.columns[i],
            categories = categories.len(),
            "Encoding categorical column"
        );
        indicator_sources.extend(categories.into_iter().map(|c| (i, c.to_string())));
    }

    let mut columns: Vec<String> = numeric.iter().map(|&i| table.columns[i].clone()).collect();
    columns.extend(
        indicator_sources
            .iter()
            .map(|(i, category)| format!("{}_{}", table.columns[*i], category)),
    );

    let mut values = Array2::zeros((n_rows, columns.len()));
    let mut fire_ids = Vec::with_capacity(n_rows);
    let mut start_dates = Vec::with_capacity(n_rows);
    let mut end_dates = Vec::with_capacity(n_rows);

    for (r, row) in table.rows.iter().enumerate() {
        fire_ids.push(row[id_idx].render());
        start_dates.push(date_of(&row[start_idx], r + 1, START_DATE)?);
        end_dates.push(date_of(&row[end_idx], r + 1, END_DATE)?);

        for (j, &src) in numeric.iter().enumerate() {
            values[[r, j]] = row[src].as_number();
        }
        for (k, (src, category)) in indicator_sources.iter().enumerate() {
            if matches!(&row[*src], Cell::Text(s) if s == category) {
                values[[r, numeric.len() + k]] = 1.0;
            }
        }
    }

    Ok(EncodedTable {
        fire_ids,
        start_dates,
        end_dates,
        columns,
        values,
    })
}

fn date_of(cell: &Cell, row: usize, column: &str) -> DataResult<NaiveDate> {
    match cell {
        Cell::Date(d) => Ok(*d),
        other => Err(DataError::InvalidDate {
            row,
            column: column.to_string(),
            value: other.render(),
        }),
    }
}

/// Full preparation run: read, clean, encode and persist both artifacts.
pub fn prepare_dataset(
    raw_path: &Path,
    prepared_path: &Path,
    encoded_path: &Path,
) -> DataResult<PreparationSummary> {
    info!(path = %raw_path.display(), "Preparing incident dataset");

    let raw = RawTable::from_path(raw_path)?;
    let prepared = clean(&raw)?;
    let encoded = encode(&prepared)?;

    write_artifact(prepared_path, |w| prepared.write_csv(w))?;
    info!(path = %prepared_path.display(), "Prepared dataset saved");

    write_artifact(encoded_path, |w| encoded.write_csv(w))?;
    info!(path = %encoded_path.display(), "Encoded dataset saved");

    let losses: Vec<f64> = encoded.column(ACTUAL_LOSS)?.to_vec();
    let summary = PreparationSummary {
        rows: encoded.n_rows(),
        categorical_columns: prepared.categorical_columns(),
        encoded_columns: encoded.columns.len(),
        loss: LossDistribution::from_data(&losses),
    };

    info!(
        rows = summary.rows,
        encoded_columns = summary.encoded_columns,
        categorical = ?summary.categorical_columns,
        loss_mean = summary.loss.mean,
        loss_median = summary.loss.median,
        loss_max = summary.loss.max,
        "Dataset preparation complete"
    );

    Ok(summary)
}

fn write_artifact<F>(path: &Path, write: F) -> DataResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> DataResult<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer)?;
    writer.flush()?;
    Ok(())
}
