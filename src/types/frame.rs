//! Feature frame: the wide table produced by feature engineering
//!
//! A frame keeps the two key columns (timestamp, equipment id) typed and holds
//! every other column as a named `f64` vector. Stages only ever add columns;
//! the frame enforces equal lengths and unique names.

use chrono::NaiveDateTime;
use std::collections::HashMap;

use super::{EquipmentGroups, EquipmentId, SensorChannel, TableError, TelemetryTable};

/// Label column names, in the order they are emitted.
pub mod label_columns {
    pub const FAILURE: &str = "failure";
    pub const RISK_LEVEL: &str = "risk_level";
    pub const FAILURE_PROBABILITY: &str = "failure_probability";
}

/// One named numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: Vec<f64>,
}

impl FeatureColumn {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureFrame {
    timestamps: Vec<NaiveDateTime>,
    equipment_ids: Vec<EquipmentId>,
    columns: Vec<FeatureColumn>,
    index: HashMap<String, usize>,
}

impl FeatureFrame {
    /// Build a frame from key columns and value columns.
    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        equipment_ids: Vec<EquipmentId>,
        columns: Vec<FeatureColumn>,
    ) -> Result<Self, TableError> {
        if equipment_ids.len() != timestamps.len() {
            return Err(TableError::LengthMismatch {
                column: "equipment_id".to_string(),
                expected: timestamps.len(),
                found: equipment_ids.len(),
            });
        }
        let frame = Self {
            timestamps,
            equipment_ids,
            columns: Vec::with_capacity(columns.len()),
            index: HashMap::with_capacity(columns.len()),
        };
        frame.with_columns(columns)
    }

    /// Canonical channels (plus label columns when present) of a telemetry table.
    pub fn from_telemetry(table: &TelemetryTable) -> Self {
        let mut columns: Vec<FeatureColumn> = SensorChannel::ALL
            .iter()
            .map(|&ch| FeatureColumn::new(ch.name(), table.channel(ch).to_vec()))
            .collect();

        if let Some(labels) = table.labels() {
            columns.push(FeatureColumn::new(
                label_columns::FAILURE,
                labels.failure.iter().map(|&f| f64::from(f)).collect(),
            ));
            columns.push(FeatureColumn::new(
                label_columns::RISK_LEVEL,
                labels
                    .risk_level
                    .iter()
                    .map(|l| f64::from(l.as_u8()))
                    .collect(),
            ));
            columns.push(FeatureColumn::new(
                label_columns::FAILURE_PROBABILITY,
                labels.failure_probability.clone(),
            ));
        }

        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        Self {
            timestamps: table.timestamps().to_vec(),
            equipment_ids: table.equipment_ids().to_vec(),
            columns,
            index,
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

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    /// Value column names in order (key columns excluded).
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.index
            .get(name)
            .map(|&i| self.columns[i].values.as_slice())
    }

    /// Like [`column`](Self::column) but missing columns are an error.
    pub fn require(&self, name: &str) -> Result<&[f64], TableError> {
        self.column(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    pub fn channel(&self, channel: SensorChannel) -> Result<&[f64], TableError> {
        self.require(channel.name())
    }

    /// Consume the frame and return it widened by `columns`.
    pub fn with_columns(mut self, columns: Vec<FeatureColumn>) -> Result<Self, TableError> {
        for column in columns {
            if column.values.len() != self.len() {
                return Err(TableError::LengthMismatch {
                    column: column.name,
                    expected: self.len(),
                    found: column.values.len(),
                });
            }
            if self.index.contains_key(&column.name) {
                return Err(TableError::DuplicateColumn(column.name));
            }
            self.index.insert(column.name.clone(), self.columns.len());
            self.columns.push(column);
        }
        Ok(self)
    }

    /// Drop the named columns; unknown names are ignored.
    pub fn without_columns(self, names: &[&str]) -> Self {
        let columns: Vec<FeatureColumn> = self
            .columns
            .into_iter()
            .filter(|c| !names.contains(&c.name.as_str()))
            .collect();
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        Self {
            timestamps: self.timestamps,
            equipment_ids: self.equipment_ids,
            columns,
            index,
        }
    }

    /// New frame containing `rows` in the given order (indices may repeat).
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            timestamps: rows.iter().map(|&r| self.timestamps[r]).collect(),
            equipment_ids: rows.iter().map(|&r| self.equipment_ids[r].clone()).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| FeatureColumn {
                    name: c.name.clone(),
                    values: rows.iter().map(|&r| c.values[r]).collect(),
                })
                .collect(),
            index: self.index.clone(),
        }
    }

    /// Rows grouped per equipment unit, time-ordered within each unit.
    pub fn groups(&self) -> EquipmentGroups {
        EquipmentGroups::new(&self.equipment_ids, &self.timestamps)
    }

    /// Copy of the frame sorted by (equipment, timestamp), stable for ties.
    pub fn sorted_by_equipment_time(&self) -> Self {
        self.select_rows(self.groups().order())
    }

    /// All value columns of one row, in column order.
    pub fn row_values(&self, row: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c.values[row]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    fn frame() -> FeatureFrame {
        FeatureFrame::new(
            vec![ts(1), ts(0), ts(0)],
            vec![
                EquipmentId::from_raw("A"),
                EquipmentId::from_raw("A"),
                EquipmentId::from_raw("B"),
            ],
            vec![FeatureColumn::new("x", vec![1.0, 2.0, 3.0])],
        )
        .unwrap()
    }

    #[test]
    fn test_with_columns_rejects_duplicates_and_bad_lengths() {
        let f = frame();
        let dup = f.clone().with_columns(vec![FeatureColumn::new("x", vec![0.0; 3])]);
        assert_eq!(dup, Err(TableError::DuplicateColumn("x".to_string())));

        let short = f.with_columns(vec![FeatureColumn::new("y", vec![0.0; 2])]);
        assert!(matches!(short, Err(TableError::LengthMismatch { .. })));
    }

    #[test]
    fn test_sorted_by_equipment_time() {
        let sorted = frame().sorted_by_equipment_time();
        assert_eq!(sorted.column("x"), Some(&[2.0, 1.0, 3.0][..]));
        assert_eq!(sorted.timestamps(), &[ts(0), ts(1), ts(0)]);
    }

    #[test]
    fn test_without_columns_rebuilds_index() {
        let f = frame()
            .with_columns(vec![FeatureColumn::new("y", vec![9.0; 3])])
            .unwrap()
            .without_columns(&["x"]);
        assert!(!f.has_column("x"));
        assert_eq!(f.column("y"), Some(&[9.0, 9.0, 9.0][..]));
    }
}
