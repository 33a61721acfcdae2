//! Delimited tables
//!
//! One header row, one row per record. Timestamps use
//! [`TIMESTAMP_FORMAT`]; an empty field is a missing value (`NaN`). Channel
//! columns always carry their canonical names; aliasing to short names is the
//! consumer's job.

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::{ensure_parent, StorageError};
use crate::generator::EquipmentLocation;
use crate::types::{
    label_columns, EquipmentId, FeatureColumn, FeatureFrame, RiskColumns, RiskLevel,
    SensorChannel, TelemetryTable, TIMESTAMP_FORMAT,
};

const TIMESTAMP: &str = "timestamp";
const EQUIPMENT_ID: &str = "equipment_id";

fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn parse_value(raw: &str, row: usize, column: &str) -> Result<f64, StorageError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    raw.parse().map_err(|_| StorageError::Parse {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

fn parse_timestamp(raw: &str, row: usize) -> Result<NaiveDateTime, StorageError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| StorageError::Parse {
            row,
            column: TIMESTAMP.to_string(),
            value: raw.to_string(),
        })
}

/// Column positions by header name.
struct HeaderIndex(HashMap<String, usize>);

impl HeaderIndex {
    fn new(headers: &StringRecord) -> Self {
        Self(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.trim().to_string(), i))
                .collect(),
        )
    }

    fn get(&self, name: &str) -> Option<usize> {
        self.0.get(name).copied()
    }

    fn require(&self, name: &str) -> Result<usize, StorageError> {
        self.get(name)
            .ok_or_else(|| StorageError::MissingColumn(name.to_string()))
    }
}

fn field<'r>(record: &'r StringRecord, index: usize) -> &'r str {
    record.get(index).unwrap_or("")
}

// ============================================================================
// Telemetry tables
// ============================================================================

/// Write a (possibly labeled) telemetry table.
pub fn write_telemetry_csv(path: &Path, table: &TelemetryTable) -> Result<(), StorageError> {
    ensure_parent(path)?;
    let mut writer = WriterBuilder::new().from_path(path)?;

    let mut header: Vec<&str> = vec![TIMESTAMP, EQUIPMENT_ID];
    header.extend(SensorChannel::ALL.iter().map(|ch| ch.name()));
    if table.is_labeled() {
        header.extend([
            label_columns::FAILURE,
            label_columns::RISK_LEVEL,
            label_columns::FAILURE_PROBABILITY,
        ]);
    }
    writer.write_record(&header)?;

    let mut row: Vec<String> = Vec::with_capacity(header.len());
    for i in 0..table.len() {
        row.clear();
        row.push(table.timestamps()[i].format(TIMESTAMP_FORMAT).to_string());
        row.push(table.equipment_ids()[i].as_str().to_string());
        row.extend(table.readings(i).iter().map(|&v| format_value(v)));
        if let Some(labels) = table.labels() {
            row.push(labels.failure[i].to_string());
            row.push(labels.risk_level[i].as_u8().to_string());
            row.push(format_value(labels.failure_probability[i]));
        }
        writer.write_record(&row)?;
    }
    writer.flush().map_err(|e| StorageError::io(path, e))?;

    info!(path = %path.display(), rows = table.len(), labeled = table.is_labeled(), "Wrote telemetry table");
    Ok(())
}

/// Read a telemetry table.
///
/// `timestamp`, `equipment_id` and all 16 channels are required. Labels are
/// loaded when `risk_level` and `failure_probability` are both present;
/// `failure` is re-derived from `risk_level`. Other columns are ignored.
pub fn read_telemetry_csv(path: &Path) -> Result<TelemetryTable, StorageError> {
    let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let headers = HeaderIndex::new(reader.headers()?);

    let ts_col = headers.require(TIMESTAMP)?;
    let id_col = headers.require(EQUIPMENT_ID)?;
    let channel_cols = SensorChannel::ALL
        .iter()
        .map(|ch| headers.require(ch.name()))
        .collect::<Result<Vec<_>, _>>()?;
    let label_cols = headers
        .get(label_columns::RISK_LEVEL)
        .zip(headers.get(label_columns::FAILURE_PROBABILITY));

    let mut timestamps = Vec::new();
    let mut ids = Vec::new();
    let mut channels: Vec<Vec<f64>> = vec![Vec::new(); SensorChannel::COUNT];
    let mut labels = label_cols.map(|_| RiskColumns::default());

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        timestamps.push(parse_timestamp(field(&record, ts_col), row)?);
        ids.push(EquipmentId::from_raw(field(&record, id_col)));
        for ((column, &col), channel) in channels.iter_mut().zip(&channel_cols).zip(SensorChannel::ALL) {
            column.push(parse_value(field(&record, col), row, channel.name())?);
        }
        if let (Some(labels), Some((level_col, prob_col))) = (labels.as_mut(), label_cols) {
            let raw_level = parse_value(field(&record, level_col), row, label_columns::RISK_LEVEL)?;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let level = (raw_level.is_finite() && raw_level >= 0.0)
                .then(|| raw_level as u8)
                .and_then(RiskLevel::from_u8)
                .ok_or_else(|| StorageError::Parse {
                    row,
                    column: label_columns::RISK_LEVEL.to_string(),
                    value: field(&record, level_col).to_string(),
                })?;
            let prob = parse_value(field(&record, prob_col), row, label_columns::FAILURE_PROBABILITY)?;
            labels.push(prob, level);
        }
    }

    let table = TelemetryTable::from_columns(timestamps, ids, channels, labels)?;
    info!(path = %path.display(), rows = table.len(), labeled = table.is_labeled(), "Loaded telemetry table");
    Ok(table)
}

// ============================================================================
// Feature frames
// ============================================================================

/// Write a feature frame: key columns first, then value columns in order.
pub fn write_frame_csv(path: &Path, frame: &FeatureFrame) -> Result<(), StorageError> {
    ensure_parent(path)?;
    let mut writer = WriterBuilder::new().from_path(path)?;

    let mut header: Vec<&str> = vec![TIMESTAMP, EQUIPMENT_ID];
    header.extend(frame.column_names());
    writer.write_record(&header)?;

    let mut row: Vec<String> = Vec::with_capacity(header.len());
    for i in 0..frame.len() {
        row.clear();
        row.push(frame.timestamps()[i].format(TIMESTAMP_FORMAT).to_string());
        row.push(frame.equipment_ids()[i].as_str().to_string());
        row.extend(frame.columns().iter().map(|c| format_value(c.values[i])));
        writer.write_record(&row)?;
    }
    writer.flush().map_err(|e| StorageError::io(path, e))?;

    info!(path = %path.display(), rows = frame.len(), columns = frame.width(), "Wrote feature table");
    Ok(())
}

/// Read a feature frame; every non-key column is numeric.
pub fn read_frame_csv(path: &Path) -> Result<FeatureFrame, StorageError> {
    let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let header = reader.headers()?.clone();
    let headers = HeaderIndex::new(&header);
    let ts_col = headers.require(TIMESTAMP)?;
    let id_col = headers.require(EQUIPMENT_ID)?;

    let value_cols: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != ts_col && *i != id_col)
        .map(|(i, name)| (i, name.trim().to_string()))
        .collect();

    let mut timestamps = Vec::new();
    let mut ids = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); value_cols.len()];

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        timestamps.push(parse_timestamp(field(&record, ts_col), row)?);
        ids.push(EquipmentId::from_raw(field(&record, id_col)));
        for ((col, name), column) in value_cols.iter().zip(values.iter_mut()) {
            column.push(parse_value(field(&record, *col), row, name)?);
        }
    }

    let columns = value_cols
        .into_iter()
        .zip(values)
        .map(|((_, name), values)| FeatureColumn::new(name, values))
        .collect();
    let frame = FeatureFrame::new(timestamps, ids, columns)?;
    debug!(path = %path.display(), rows = frame.len(), columns = frame.width(), "Loaded feature table");
    Ok(frame)
}

// ============================================================================
// Location reference table
// ============================================================================

pub fn write_locations_csv(path: &Path, locations: &[EquipmentLocation]) -> Result<(), StorageError> {
    ensure_parent(path)?;
    let mut writer = WriterBuilder::new().from_path(path)?;
    for location in locations {
        writer.serialize(location)?;
    }
    writer.flush().map_err(|e| StorageError::io(path, e))?;
    info!(path = %path.display(), rows = locations.len(), "Wrote location table");
    Ok(())
}

pub fn read_locations_csv(path: &Path) -> Result<Vec<EquipmentLocation>, StorageError> {
    let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let mut locations = Vec::new();
    for record in reader.deserialize() {
        locations.push(record?);
    }
    Ok(locations)
}
