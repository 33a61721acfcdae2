//! Telemetry records and the column-oriented telemetry table

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{EquipmentGroups, EquipmentId, RiskColumns, SensorChannel};

/// Timestamp format used by every delimited table.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row: equipment identity, timestamp and all channel values.
///
/// Missing values are represented as `NaN` until the preprocessor fills them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub timestamp: NaiveDateTime,
    pub equipment_id: EquipmentId,
    pub readings: [f64; SensorChannel::COUNT],
}

impl TelemetryRecord {
    pub fn reading(&self, channel: SensorChannel) -> f64 {
        self.readings[channel.index()]
    }
}

/// Structural errors when assembling tables.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("column '{column}' has {found} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("cannot concatenate a labeled table with an unlabeled one")]
    LabelMismatch,
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
    #[error("column '{0}' not found")]
    MissingColumn(String),
}

/// Column-oriented telemetry table in the canonical 16-channel schema.
///
/// Columns always have equal length. Risk labels are an optional, declared
/// extension of the schema rather than ad-hoc extra columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryTable {
    timestamps: Vec<NaiveDateTime>,
    equipment_ids: Vec<EquipmentId>,
    channels: Vec<Vec<f64>>,
    labels: Option<RiskColumns>,
}

impl Default for TelemetryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryTable {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(rows: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(rows),
            equipment_ids: Vec::with_capacity(rows),
            channels: (0..SensorChannel::COUNT)
                .map(|_| Vec::with_capacity(rows))
                .collect(),
            labels: None,
        }
    }

    /// Assemble a table from whole columns (channels in canonical order).
    pub fn from_columns(
        timestamps: Vec<NaiveDateTime>,
        equipment_ids: Vec<EquipmentId>,
        channels: Vec<Vec<f64>>,
        labels: Option<RiskColumns>,
    ) -> Result<Self, TableError> {
        let rows = timestamps.len();
        if equipment_ids.len() != rows {
            return Err(TableError::LengthMismatch {
                column: "equipment_id".to_string(),
                expected: rows,
                found: equipment_ids.len(),
            });
        }
        if channels.len() != SensorChannel::COUNT {
            return Err(TableError::LengthMismatch {
                column: "<channels>".to_string(),
                expected: SensorChannel::COUNT,
                found: channels.len(),
            });
        }
        for (channel, column) in SensorChannel::ALL.iter().zip(&channels) {
            if column.len() != rows {
                return Err(TableError::LengthMismatch {
                    column: channel.name().to_string(),
                    expected: rows,
                    found: column.len(),
                });
            }
        }
        let table = Self {
            timestamps,
            equipment_ids,
            channels,
            labels: None,
        };
        match labels {
            Some(labels) => table.with_labels(labels),
            None => Ok(table),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn equipment_ids(&self) -> &[EquipmentId] {
        &self.equipment_ids
    }

    pub fn channel(&self, channel: SensorChannel) -> &[f64] {
        &self.channels[channel.index()]
    }

    pub(crate) fn channel_mut(&mut self, channel: SensorChannel) -> &mut Vec<f64> {
        &mut self.channels[channel.index()]
    }

    pub fn labels(&self) -> Option<&RiskColumns> {
        self.labels.as_ref()
    }

    pub fn is_labeled(&self) -> bool {
        self.labels.is_some()
    }

    /// Attach label columns. Fails if their length differs from the table.
    pub fn with_labels(mut self, labels: RiskColumns) -> Result<Self, TableError> {
        if labels.len() != self.len() {
            return Err(TableError::LengthMismatch {
                column: "risk_level".to_string(),
                expected: self.len(),
                found: labels.len(),
            });
        }
        self.labels = Some(labels);
        Ok(self)
    }

    pub fn without_labels(mut self) -> Self {
        self.labels = None;
        self
    }

    /// Append a single unlabeled row.
    pub fn push(&mut self, record: TelemetryRecord) {
        self.timestamps.push(record.timestamp);
        self.equipment_ids.push(record.equipment_id);
        for (column, value) in self.channels.iter_mut().zip(record.readings) {
            column.push(value);
        }
    }

    /// Append one equipment's contiguous series: one timestamp per row and one
    /// vector per channel in canonical order.
    pub fn append_series(
        &mut self,
        equipment_id: &EquipmentId,
        timestamps: &[NaiveDateTime],
        columns: &[Vec<f64>],
    ) -> Result<(), TableError> {
        if self.labels.is_some() {
            return Err(TableError::LabelMismatch);
        }
        if columns.len() != SensorChannel::COUNT {
            return Err(TableError::LengthMismatch {
                column: "<channels>".to_string(),
                expected: SensorChannel::COUNT,
                found: columns.len(),
            });
        }
        for (channel, column) in SensorChannel::ALL.iter().zip(columns) {
            if column.len() != timestamps.len() {
                return Err(TableError::LengthMismatch {
                    column: channel.name().to_string(),
                    expected: timestamps.len(),
                    found: column.len(),
                });
            }
        }

        self.timestamps.extend_from_slice(timestamps);
        self.equipment_ids
            .extend(std::iter::repeat(equipment_id.clone()).take(timestamps.len()));
        for (dst, src) in self.channels.iter_mut().zip(columns) {
            dst.extend_from_slice(src);
        }
        Ok(())
    }

    /// Append every row of `other`. Both tables must agree on labeling.
    pub fn extend_from(&mut self, other: &TelemetryTable) -> Result<(), TableError> {
        match (&mut self.labels, &other.labels) {
            (None, None) => {}
            (Some(mine), Some(theirs)) => {
                mine.failure_probability
                    .extend_from_slice(&theirs.failure_probability);
                mine.risk_level.extend_from_slice(&theirs.risk_level);
                mine.failure.extend_from_slice(&theirs.failure);
            }
            // An empty unlabeled table adopts the other's label schema
            (None, Some(theirs)) if self.timestamps.is_empty() => {
                self.labels = Some(theirs.clone());
            }
            _ => return Err(TableError::LabelMismatch),
        }
        self.timestamps.extend_from_slice(&other.timestamps);
        self.equipment_ids.extend_from_slice(&other.equipment_ids);
        for (dst, src) in self.channels.iter_mut().zip(&other.channels) {
            dst.extend_from_slice(src);
        }
        Ok(())
    }

    /// All channel values of one row, in canonical order.
    pub fn readings(&self, row: usize) -> [f64; SensorChannel::COUNT] {
        let mut out = [0.0; SensorChannel::COUNT];
        for (slot, column) in out.iter_mut().zip(&self.channels) {
            *slot = column[row];
        }
        out
    }

    pub fn record(&self, row: usize) -> TelemetryRecord {
        TelemetryRecord {
            timestamp: self.timestamps[row],
            equipment_id: self.equipment_ids[row].clone(),
            readings: self.readings(row),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = TelemetryRecord> + '_ {
        (0..self.len()).map(|row| self.record(row))
    }

    /// New table containing `rows` in the given order (indices may repeat).
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            timestamps: rows.iter().map(|&r| self.timestamps[r]).collect(),
            equipment_ids: rows.iter().map(|&r| self.equipment_ids[r].clone()).collect(),
            channels: self
                .channels
                .iter()
                .map(|column| rows.iter().map(|&r| column[r]).collect())
                .collect(),
            labels: self.labels.as_ref().map(|l| l.select(rows)),
        }
    }

    /// Rows grouped per equipment unit, time-ordered within each unit.
    pub fn groups(&self) -> EquipmentGroups {
        EquipmentGroups::new(&self.equipment_ids, &self.timestamps)
    }

    /// Distinct equipment ids in sorted order.
    pub fn distinct_equipment(&self) -> Vec<EquipmentId> {
        let mut ids = self.equipment_ids.clone();
        ids.sort();
        ids.dedup();
        ids
    }
}

impl FromIterator<TelemetryRecord> for TelemetryTable {
    fn from_iter<I: IntoIterator<Item = TelemetryRecord>>(iter: I) -> Self {
        let mut table = TelemetryTable::new();
        for record in iter {
            table.push(record);
        }
        table
    }
}
