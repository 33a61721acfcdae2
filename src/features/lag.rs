//! Lagged readings per equipment unit.
//!
//! A lag reaching before the unit's first row is 0, not undefined.

use super::{FeatureError, FeatureFamily, FeatureStage};
use crate::preprocessing::DataQualityReport;
use crate::types::{FeatureColumn, FeatureFrame, SensorChannel};

/// `series` shifted forward by `lag` rows, 0-filled at the start.
pub(crate) fn shift(series: &[f64], lag: usize) -> Vec<f64> {
    (0..series.len())
        .map(|i| if i >= lag { series[i - lag] } else { 0.0 })
        .collect()
}

pub struct LagStage {
    channels: Vec<SensorChannel>,
    lags: Vec<usize>,
}

impl LagStage {
    pub fn new(channels: &[SensorChannel], lags: &[usize]) -> Self {
        Self {
            channels: channels.to_vec(),
            lags: lags.to_vec(),
        }
    }
}

impl FeatureStage for LagStage {
    fn name(&self) -> &'static str {
        "lag"
    }

    fn family(&self) -> FeatureFamily {
        FeatureFamily::Lag
    }

    fn compute(
        &self,
        frame: &FeatureFrame,
        _report: &mut DataQualityReport,
    ) -> Result<Vec<FeatureColumn>, FeatureError> {
        let groups = frame.groups();
        let mut columns = Vec::with_capacity(self.channels.len() * self.lags.len());
        for &channel in &self.channels {
            let values = frame.channel(channel)?;
            for &lag in &self.lags {
                columns.push(FeatureColumn::new(
                    format!("{channel}_lag_{lag}"),
                    groups.map_series(values, |s| shift(s, lag)),
                ));
            }
        }
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_fills_zero() {
        assert_eq!(shift(&[1.0, 2.0, 3.0, 4.0], 1), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(shift(&[1.0, 2.0, 3.0, 4.0], 3), vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(shift(&[1.0, 2.0], 12), vec![0.0, 0.0]);
    }
}
