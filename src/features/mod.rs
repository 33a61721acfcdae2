//! Feature Engineer
//!
//! A fixed sequence of pure stages. Each stage reads the current frame and
//! returns new columns; the engineer merges them, so a stage never mutates
//! the columns another stage produced. Stages that work per equipment unit
//! build their own time-ordered grouping from the key columns.
//!
//! ```text
//! temporal → rolling → lag → rate_of_change → interaction → domain
//!          → statistics → encoding
//! ```

mod domain;
mod encoding;
mod interaction;
mod lag;
mod rate;
mod rolling;
mod statistics;
mod temporal;

pub use domain::DomainStage;
pub use encoding::EncodingStage;
pub use interaction::InteractionStage;
pub use lag::LagStage;
pub use rate::RateOfChangeStage;
pub use rolling::{rolling_window, RollingStage, RollingWindow};
pub use statistics::StatisticsStage;
pub use temporal::TemporalStage;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use crate::config::FeatureConfig;
use crate::preprocessing::DataQualityReport;
use crate::types::{FeatureColumn, FeatureFrame, TableError, TelemetryTable};

#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("invalid feature configuration: {0}")]
    Config(String),
    #[error("stage '{stage}' returned {found} rows, expected {expected}")]
    StageShape {
        stage: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Feature families used for the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFamily {
    Temporal,
    Rolling,
    Lag,
    RateOfChange,
    Interaction,
    Domain,
    Statistical,
    Encoding,
}

impl fmt::Display for FeatureFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureFamily::Temporal => "temporal",
            FeatureFamily::Rolling => "rolling",
            FeatureFamily::Lag => "lag",
            FeatureFamily::RateOfChange => "rate_of_change",
            FeatureFamily::Interaction => "interaction",
            FeatureFamily::Domain => "domain",
            FeatureFamily::Statistical => "statistical",
            FeatureFamily::Encoding => "encoding",
        };
        f.write_str(name)
    }
}

/// One transform of the feature pipeline.
///
/// `compute` must return columns of exactly `frame.len()` rows, in the
/// frame's current row order, and must not depend on that order for any
/// per-equipment computation.
pub trait FeatureStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn family(&self) -> FeatureFamily;

    fn compute(
        &self,
        frame: &FeatureFrame,
        report: &mut DataQualityReport,
    ) -> Result<Vec<FeatureColumn>, FeatureError>;
}

/// Row and column counts of an engineered frame.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FeatureSummary {
    pub rows: usize,
    /// Value columns, key columns excluded
    pub columns: usize,
    pub per_family: BTreeMap<FeatureFamily, usize>,
}

impl FeatureSummary {
    pub fn count(&self, family: FeatureFamily) -> usize {
        self.per_family.get(&family).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct FeatureOutcome {
    pub frame: FeatureFrame,
    pub summary: FeatureSummary,
    pub report: DataQualityReport,
}

pub struct FeatureEngineer {
    stages: Vec<Box<dyn FeatureStage>>,
}

impl FeatureEngineer {
    /// Standard stage sequence for `config`.
    pub fn new(config: &FeatureConfig) -> Result<Self, FeatureError> {
        let mut errors = Vec::new();
        if config.rolling_windows.is_empty() || config.rolling_windows.contains(&0) {
            errors.push("rolling_windows must be non-empty and positive");
        }
        if config.lag_hours.is_empty() || config.lag_hours.contains(&0) {
            errors.push("lag_hours must be non-empty and positive");
        }
        if !errors.is_empty() {
            return Err(FeatureError::Config(errors.join("; ")));
        }

        let stages: Vec<Box<dyn FeatureStage>> = vec![
            Box::new(TemporalStage),
            Box::new(RollingStage::new(&config.rolling_channels, &config.rolling_windows)),
            Box::new(LagStage::new(&config.lag_channels, &config.lag_hours)),
            Box::new(RateOfChangeStage::new(&config.rate_of_change_channels)),
            Box::new(InteractionStage::new(config.reference_temperature)),
            Box::new(DomainStage::new(&config.domain)),
            Box::new(StatisticsStage::new(&config.statistics_channels)),
            Box::new(EncodingStage::new(
                config.one_hot_equipment,
                config.max_one_hot_cardinality,
            )),
        ];
        Ok(Self { stages })
    }

    /// Engineer with an explicit stage list.
    pub fn with_stages(stages: Vec<Box<dyn FeatureStage>>) -> Self {
        Self { stages }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Engineer features for a (normally labeled) telemetry table.
    ///
    /// The output is sorted by (equipment, timestamp).
    pub fn engineer(&self, table: &TelemetryTable) -> Result<FeatureOutcome, FeatureError> {
        self.engineer_frame(FeatureFrame::from_telemetry(table).sorted_by_equipment_time())
    }

    /// Run every stage over `frame`, in order.
    pub fn engineer_frame(&self, frame: FeatureFrame) -> Result<FeatureOutcome, FeatureError> {
        let mut report = DataQualityReport::new();
        let mut per_family = BTreeMap::new();
        let mut frame = frame;

        for stage in &self.stages {
            let columns = stage.compute(&frame, &mut report)?;
            if let Some(bad) = columns.iter().find(|c| c.values.len() != frame.len()) {
                return Err(FeatureError::StageShape {
                    stage: stage.name(),
                    expected: frame.len(),
                    found: bad.values.len(),
                });
            }
            debug!(stage = stage.name(), added = columns.len(), "Feature stage complete");
            *per_family.entry(stage.family()).or_insert(0) += columns.len();
            frame = frame.with_columns(columns)?;
        }

        let summary = FeatureSummary {
            rows: frame.len(),
            columns: frame.width(),
            per_family,
        };
        info!(
            rows = summary.rows,
            columns = summary.columns,
            families = ?summary.per_family,
            "Feature engineering complete"
        );
        Ok(FeatureOutcome {
            frame,
            summary,
            report,
        })
    }
}

/// Fill undefined (`NaN`) values with 0.
pub(crate) fn zero_fill(values: &mut [f64]) {
    for v in values.iter_mut().filter(|v| v.is_nan()) {
        *v = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EquipmentId, SensorChannel, TelemetryRecord};
    use chrono::{NaiveDate, TimeDelta};

    fn table(units: usize, hours: i64) -> TelemetryTable {
        let t0 = NaiveDate::from_ymd_opt(2023, 3, 4)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let mut rows = Vec::new();
        for u in 1..=units {
            for h in 0..hours {
                let mut readings = [0.0; SensorChannel::COUNT];
                for ch in SensorChannel::ALL {
                    let (lo, hi) = ch.physical_range();
                    readings[ch.index()] = lo + (hi - lo) * ((h as f64 + u as f64) % 7.0) / 10.0;
                }
                rows.push(TelemetryRecord {
                    timestamp: t0 + TimeDelta::hours(h),
                    equipment_id: EquipmentId::new(1, u),
                    readings,
                });
            }
        }
        rows.into_iter().collect()
    }

    #[test]
    fn test_summary_counts_default_pipeline() {
        let config = FeatureConfig::default();
        let engineer = FeatureEngineer::new(&config).unwrap();
        let out = engineer.engineer(&table(3, 30)).unwrap();
        let s = &out.summary;

        assert_eq!(s.rows, 90);
        assert_eq!(s.count(FeatureFamily::Temporal), 8);
        assert_eq!(s.count(FeatureFamily::Rolling), 8 * 4 * 4);
        assert_eq!(s.count(FeatureFamily::Lag), 4 * 4);
        assert_eq!(s.count(FeatureFamily::RateOfChange), 4 * 2);
        assert_eq!(s.count(FeatureFamily::Interaction), 5);
        assert_eq!(s.count(FeatureFamily::Domain), 14);
        assert_eq!(s.count(FeatureFamily::Statistical), 4 * 3);
        assert_eq!(s.count(FeatureFamily::Encoding), 3);
        let added: usize = s.per_family.values().sum();
        assert_eq!(s.columns, SensorChannel::COUNT + added);
    }

    #[test]
    fn test_output_sorted_by_equipment_time() {
        let engineer = FeatureEngineer::new(&FeatureConfig::default()).unwrap();
        let input = table(2, 5);
        let shuffled = input.select_rows(&[9, 0, 4, 7, 1, 3, 8, 2, 6, 5]);
        let out = engineer.engineer(&shuffled).unwrap();
        assert_eq!(out.frame, engineer.engineer(&input).unwrap().frame);
        assert_eq!(out.frame.equipment_ids()[0], EquipmentId::new(1, 1));
        assert_eq!(out.frame.equipment_ids()[5], EquipmentId::new(1, 2));
    }

    #[test]
    fn test_empty_windows_rejected() {
        let config = FeatureConfig {
            rolling_windows: vec![],
            ..FeatureConfig::default()
        };
        assert!(matches!(FeatureEngineer::new(&config), Err(FeatureError::Config(_))));
    }

    #[test]
    fn test_stage_order() {
        let engineer = FeatureEngineer::new(&FeatureConfig::default()).unwrap();
        assert_eq!(
            engineer.stage_names(),
            vec![
                "temporal",
                "rolling",
                "lag",
                "rate_of_change",
                "interaction",
                "domain",
                "statistics",
                "encoding"
            ]
        );
    }
}
