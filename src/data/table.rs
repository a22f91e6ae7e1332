//! In-memory tables: the raw CSV as read, and the encoded model-ready table.

use crate::data::columns::{
    ACTUAL_LOSS, END_DATE, FIRE_ID, NON_FEATURE_COLUMNS, SEVERITY_INDEX, START_DATE,
    TARGET_COLUMNS,
};
use crate::data::error::{DataError, DataResult};
use chrono::{NaiveDate, NaiveDateTime};
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Day-first formats first; ISO is accepted for tables that were already normalised.
const DATE_FORMATS: [&str; 4] = ["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%d-%m-%Y %H:%M"];

/// Parse a date using the day-first convention.
pub fn parse_day_first(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Parse a numeric cell; boolean indicator cells written by other tools count as 0/1.
pub fn parse_number(value: &str) -> Option<f64> {
    match value.trim() {
        "True" | "true" => Some(1.0),
        "False" | "false" => Some(0.0),
        other => other.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

/// Raw CSV contents with trimmed cells; empty string means missing
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn from_path(path: &Path) -> DataResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> DataResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        if rows.is_empty() {
            return Err(DataError::Empty);
        }

        Ok(Self { headers, rows })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Fail with every absent column named at once.
    pub fn require_columns(&self, required: &[&str]) -> DataResult<()> {
        let missing: Vec<String> = required
            .iter()
            .filter(|name| self.column_index(name).is_none())
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DataError::MissingColumns(missing))
        }
    }
}

/// Model-ready table: identifiers and dates kept aside, every other column numeric
#[derive(Debug, Clone)]
pub struct EncodedTable {
    pub fire_ids: Vec<String>,
    pub start_dates: Vec<NaiveDate>,
    pub end_dates: Vec<NaiveDate>,
    /// Numeric column names, matching the columns of `values`
    pub columns: Vec<String>,
    pub values: Array2<f64>,
}

impl EncodedTable {
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Copy of a single numeric column.
    pub fn column(&self, name: &str) -> DataResult<Array1<f64>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| DataError::MissingColumns(vec![name.to_string()]))?;
        Ok(self.values.column(idx).to_owned())
    }

    /// Feature schema: every numeric column except the two targets, in table order.
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::new(
            self.columns
                .iter()
                .filter(|c| !TARGET_COLUMNS.contains(&c.as_str()))
                .cloned()
                .collect(),
        )
    }

    /// Feature matrix with columns in schema order.
    pub fn features(&self, schema: &FeatureSchema) -> DataResult<Array2<f64>> {
        let indices: Vec<usize> = schema
            .columns()
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| DataError::MissingColumns(vec![name.clone()]))
            })
            .collect::<DataResult<_>>()?;

        let mut features = Array2::zeros((self.n_rows(), indices.len()));
        for (j, &src) in indices.iter().enumerate() {
            features.column_mut(j).assign(&self.values.column(src));
        }
        Ok(features)
    }

    pub fn from_path(path: &Path) -> DataResult<Self> {
        let raw = RawTable::from_path(path)?;
        Self::from_raw(&raw)
    }

    pub fn from_reader<R: Read>(reader: R) -> DataResult<Self> {
        let raw = RawTable::from_reader(reader)?;
        Self::from_raw(&raw)
    }

    fn from_raw(raw: &RawTable) -> DataResult<Self> {
        let mut required: Vec<&str> = NON_FEATURE_COLUMNS.to_vec();
        required.extend([ACTUAL_LOSS, SEVERITY_INDEX]);
        raw.require_columns(&required)?;

        let id_idx = raw.column_index(FIRE_ID).unwrap_or_default();
        let start_idx = raw.column_index(START_DATE).unwrap_or_default();
        let end_idx = raw.column_index(END_DATE).unwrap_or_default();

        let numeric: Vec<(usize, &String)> = raw
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !NON_FEATURE_COLUMNS.contains(&h.as_str()))
            .collect();

        let mut fire_ids = Vec::with_capacity(raw.rows.len());
        let mut start_dates = Vec::with_capacity(raw.rows.len());
        let mut end_dates = Vec::with_capacity(raw.rows.len());
        let mut values = Array2::zeros((raw.rows.len(), numeric.len()));

        for (i, row) in raw.rows.iter().enumerate() {
            let row_no = i + 1;
            fire_ids.push(row[id_idx].clone());
            start_dates.push(parse_date_cell(row_no, START_DATE, &row[start_idx])?);
            end_dates.push(parse_date_cell(row_no, END_DATE, &row[end_idx])?);

            for (j, (src, name)) in numeric.iter().enumerate() {
                let cell = &row[*src];
                if cell.is_empty() {
                    return Err(DataError::MissingValue {
                        row: row_no,
                        column: (*name).clone(),
                    });
                }
                values[[i, j]] = parse_number(cell).ok_or_else(|| DataError::InvalidNumber {
                    row: row_no,
                    column: (*name).clone(),
                    value: cell.clone(),
                })?;
            }
        }

        Ok(Self {
            fire_ids,
            start_dates,
            end_dates,
            columns: numeric.into_iter().map(|(_, name)| name.clone()).collect(),
            values,
        })
    }

    /// Write identifiers and dates first, then every numeric column.
    pub fn write_csv<W: Write>(&self, writer: W) -> DataResult<()> {
        let mut writer = csv::Writer::from_writer(writer);

        let mut header: Vec<&str> = NON_FEATURE_COLUMNS.to_vec();
        header.extend(self.columns.iter().map(String::as_str));
        writer.write_record(&header)?;

        for (i, row) in self.values.outer_iter().enumerate() {
            let mut record = vec![
                self.fire_ids[i].clone(),
                self.start_dates[i].format("%Y-%m-%d").to_string(),
                self.end_dates[i].format("%Y-%m-%d").to_string(),
            ];
            record.extend(row.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

pub(crate) fn parse_date_cell(row: usize, column: &str, value: &str) -> DataResult<NaiveDate> {
    parse_day_first(value).ok_or_else(|| DataError::InvalidDate {
        row,
        column: column.to_string(),
        value: value.to_string(),
    })
}

/// Ordered feature columns every fitted model is keyed to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Build a feature row in schema order from a name-keyed payload.
    ///
    /// Keys must match the schema exactly. Missing, unknown and non-numeric
    /// entries are all collected before failing so the caller sees every problem.
    pub fn vectorize(
        &self,
        features: &serde_json::Map<String, serde_json::Value>,
    ) -> std::result::Result<Vec<f64>, SchemaMismatch> {
        let mut mismatch = SchemaMismatch::default();
        let mut row = Vec::with_capacity(self.columns.len());

        for name in &self.columns {
            match features.get(name) {
                None => mismatch.missing.push(name.clone()),
                Some(value) => match json_number(value) {
                    Some(v) => row.push(v),
                    None => mismatch.invalid.push(name.clone()),
                },
            }
        }

        mismatch.unknown = features
            .keys()
            .filter(|key| !self.columns.contains(key))
            .cloned()
            .collect();

        if mismatch.is_empty() {
            Ok(row)
        } else {
            Err(mismatch)
        }
    }
}

fn json_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        serde_json::Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Differences between a request payload and the trained schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMismatch {
    pub missing: Vec<String>,
    pub unknown: Vec<String>,
    pub invalid: Vec<String>,
}

impl SchemaMismatch {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unknown.is_empty() && self.invalid.is_empty()
    }
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing features: {}", self.missing.join(", ")));
        }
        if !self.unknown.is_empty() {
            parts.push(format!("unknown features: {}", self.unknown.join(", ")));
        }
        if !self.invalid.is_empty() {
            parts.push(format!("non-numeric features: {}", self.invalid.join(", ")));
        }
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for SchemaMismatch {}
