//! Lifetime statistics per equipment unit: mean, sample std (0 for a single
//! row) and each row's deviation from its unit's mean.

use super::{FeatureError, FeatureFamily, FeatureStage};
use crate::preprocessing::DataQualityReport;
use crate::stats;
use crate::types::{FeatureColumn, FeatureFrame, SensorChannel};

pub struct StatisticsStage {
    channels: Vec<SensorChannel>,
}

impl StatisticsStage {
    pub fn new(channels: &[SensorChannel]) -> Self {
        Self {
            channels: channels.to_vec(),
        }
    }
}

impl FeatureStage for StatisticsStage {
    fn name(&self) -> &'static str {
        "statistics"
    }

    fn family(&self) -> FeatureFamily {
        FeatureFamily::Statistical
    }

    fn compute(
        &self,
        frame: &FeatureFrame,
        _report: &mut DataQualityReport,
    ) -> Result<Vec<FeatureColumn>, FeatureError> {
        let groups = frame.groups();
        let mut columns = Vec::with_capacity(self.channels.len() * 3);

        for &channel in &self.channels {
            let values = frame.channel(channel)?;
            let broadcast = |pick: fn((f64, f64)) -> f64| {
                groups.map_series(values, |s| {
                    let v = stats::mean_std(s).map_or(f64::NAN, pick);
                    vec![v; s.len()]
                })
            };
            let mean = broadcast(|(m, _)| m);
            let std = broadcast(|(_, s)| s);
            let deviation = values.iter().zip(&mean).map(|(v, m)| v - m).collect();

            columns.push(FeatureColumn::new(format!("{channel}_equipment_mean"), mean));
            columns.push(FeatureColumn::new(format!("{channel}_equipment_std"), std));
            columns.push(FeatureColumn::new(format!("{channel}_deviation_from_mean"), deviation));
        }
        Ok(columns)
    }
}
