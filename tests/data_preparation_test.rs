//! Integration tests for dataset preparation and the encoded-table round trip

mod common;

use fireguard::data::{
    clean, columns, encode, prepare_dataset, ColumnKind, DataError, EncodedTable, RawTable,
};
use tempfile::TempDir;

#[test]
fn test_clean_zero_fills_unreported_losses() {
    let prepared = clean(&common::raw_table()).unwrap();
    let irrigation = prepared.column_index(columns::IRRIGATION_DAMAGE).unwrap();

    // row 0 has a blank irrigation cell
    assert_eq!(prepared.rows[0][irrigation], fireguard::data::Cell::Number(0.0));
}

#[test]
fn test_clean_types_categorical_columns() {
    let prepared = clean(&common::raw_table()).unwrap();
    assert_eq!(
        prepared.categorical_columns(),
        vec!["Region".to_string(), "VegetationType".to_string()]
    );

    let start = prepared.column_index(columns::START_DATE).unwrap();
    assert_eq!(prepared.kinds[start], ColumnKind::Date);
}

#[test]
fn test_engineered_columns_are_appended() {
    let prepared = clean(&common::raw_table()).unwrap();
    let n = prepared.columns.len();
    assert_eq!(
        &prepared.columns[n - 5..],
        &columns::ENGINEERED_COLUMNS.map(String::from)
    );
}

#[test]
fn test_encode_one_hot_columns_sorted() {
    let encoded = common::encoded_table();

    let region: Vec<&String> = encoded
        .columns
        .iter()
        .filter(|c| c.starts_with("Region_"))
        .collect();
    assert_eq!(region, vec!["Region_Coastal", "Region_North", "Region_Valley"]);

    // every row sets exactly one region indicator
    let indices: Vec<usize> = region
        .iter()
        .map(|c| encoded.column_index(c).unwrap())
        .collect();
    for row in 0..encoded.n_rows() {
        let set: f64 = indices.iter().map(|&j| encoded.values[[row, j]]).sum();
        assert_eq!(set, 1.0);
    }
}

#[test]
fn test_schema_excludes_targets_and_identifiers() {
    let schema = common::encoded_table().schema();
    for excluded in [
        columns::ACTUAL_LOSS,
        columns::SEVERITY_INDEX,
        columns::FIRE_ID,
        columns::START_DATE,
        columns::END_DATE,
    ] {
        assert!(!schema.columns().iter().any(|c| c == excluded));
    }
    assert!(schema.columns().iter().any(|c| c == columns::SUPPORT_RATIO));
}

#[test]
fn test_missing_required_column_is_reported() {
    let csv = "FireID,StartDate,EndDate\nF1,01-01-2020,02-01-2020\n";
    let raw = RawTable::from_reader(csv.as_bytes()).unwrap();
    match clean(&raw).unwrap_err() {
        DataError::MissingColumns(missing) => {
            assert!(missing.contains(&columns::ACTUAL_LOSS.to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Raw fixture with one cell replaced; `row` is 1-based over data lines
fn raw_with_cell(row: usize, column: &str, value: &str) -> RawTable {
    let csv = common::raw_csv();
    let mut lines: Vec<String> = csv.lines().map(String::from).collect();
    let idx = lines[0].split(',').position(|c| c == column).unwrap();
    let mut cells: Vec<String> = lines[row].split(',').map(String::from).collect();
    cells[idx] = value.to_string();
    lines[row] = cells.join(",");

    RawTable::from_reader(lines.join("\n").as_bytes()).unwrap()
}

#[test]
fn test_zero_actual_loss_fails_support_ratio() {
    let raw = raw_with_cell(1, columns::ACTUAL_LOSS, "0");
    match clean(&raw).unwrap_err() {
        DataError::UndefinedSupportRatio { fire_id } => assert_eq!(fire_id, "F001"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unparseable_start_date_is_reported() {
    let raw = raw_with_cell(2, columns::START_DATE, "31-02-2020");
    match clean(&raw).unwrap_err() {
        DataError::InvalidDate { row, column, value } => {
            assert_eq!(row, 2);
            assert_eq!(column, "StartDate");
            assert_eq!(value, "31-02-2020");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_blank_required_numeric_is_missing_value() {
    let raw = raw_with_cell(3, columns::ROAD_DAMAGE, "");
    match clean(&raw).unwrap_err() {
        DataError::MissingValue { row, column } => {
            assert_eq!(row, 3);
            assert_eq!(column, "RoadDamage_USD");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_prepare_dataset_writes_both_artifacts() {
    let dir = TempDir::new().unwrap();
    let raw_path = dir.path().join("raw.csv");
    let prepared_path = dir.path().join("out/prepared.csv");
    let encoded_path = dir.path().join("out/encoded.csv");
    std::fs::write(&raw_path, common::raw_csv()).unwrap();

    let summary = prepare_dataset(&raw_path, &prepared_path, &encoded_path).unwrap();
    assert_eq!(summary.rows, common::INCIDENTS);
    assert!(prepared_path.exists());

    let reloaded = EncodedTable::from_path(&encoded_path).unwrap();
    let expected = encode(&clean(&common::raw_table()).unwrap()).unwrap();
    assert_eq!(reloaded.columns, expected.columns);
    assert_eq!(reloaded.start_dates, expected.start_dates);
    assert_eq!(reloaded.n_rows(), common::INCIDENTS);
}
