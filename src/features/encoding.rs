//! One-hot equipment identity.
//!
//! One column per distinct unit, so this only scales to small fleets. Above
//! the configured cardinality the stage emits nothing and reports
//! [`DataQualityWarning::OneHotSkipped`].

use super::{FeatureError, FeatureFamily, FeatureStage};
use crate::preprocessing::{DataQualityReport, DataQualityWarning};
use crate::types::{EquipmentId, FeatureColumn, FeatureFrame};

pub struct EncodingStage {
    enabled: bool,
    max_cardinality: usize,
}

impl EncodingStage {
    pub const fn new(enabled: bool, max_cardinality: usize) -> Self {
        Self {
            enabled,
            max_cardinality,
        }
    }
}

impl FeatureStage for EncodingStage {
    fn name(&self) -> &'static str {
        "encoding"
    }

    fn family(&self) -> FeatureFamily {
        FeatureFamily::Encoding
    }

    fn compute(
        &self,
        frame: &FeatureFrame,
        report: &mut DataQualityReport,
    ) -> Result<Vec<FeatureColumn>, FeatureError> {
        if !self.enabled {
            return Ok(Vec::new());
        }
        let mut distinct: Vec<&EquipmentId> = frame.equipment_ids().iter().collect();
        distinct.sort();
        distinct.dedup();

        if distinct.len() > self.max_cardinality {
            report.push(DataQualityWarning::OneHotSkipped {
                cardinality: distinct.len(),
                limit: self.max_cardinality,
            });
            return Ok(Vec::new());
        }

        Ok(distinct
            .into_iter()
            .map(|id| {
                FeatureColumn::new(
                    format!("equipment_{id}"),
                    frame
                        .equipment_ids()
                        .iter()
                        .map(|row_id| if row_id == id { 1.0 } else { 0.0 })
                        .collect(),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn frame(ids: &[&str]) -> FeatureFrame {
        let ts = NaiveDate::from_ymd_opt(2023, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        FeatureFrame::new(
            vec![ts; ids.len()],
            ids.iter().map(|&id| EquipmentId::from_raw(id)).collect(),
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_one_column_per_unit() {
        let cols = EncodingStage::new(true, 10)
            .compute(&frame(&["SUB001_EQ02", "SUB001_EQ01", "SUB001_EQ02"]), &mut DataQualityReport::new())
            .unwrap();
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].name, "equipment_SUB001_EQ01");
        assert_eq!(cols[0].values, vec![0.0, 1.0, 0.0]);
        assert_eq!(cols[1].values, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_cardinality_limit_skips_with_warning() {
        let mut report = DataQualityReport::new();
        let cols = EncodingStage::new(true, 1)
            .compute(&frame(&["A", "B"]), &mut report)
            .unwrap();
        assert!(cols.is_empty());
        assert!(report.contains(|w| matches!(
            w,
            DataQualityWarning::OneHotSkipped { cardinality: 2, limit: 1 }
        )));
    }

    #[test]
    fn test_disabled() {
        let cols = EncodingStage::new(false, 10)
            .compute(&frame(&["A"]), &mut DataQualityReport::new())
            .unwrap();
        assert!(cols.is_empty());
    }
}
