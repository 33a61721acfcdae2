//! First and second differences per equipment unit.

use super::{zero_fill, FeatureError, FeatureFamily, FeatureStage};
use crate::preprocessing::DataQualityReport;
use crate::types::{FeatureColumn, FeatureFrame, SensorChannel};

/// `x[i] - x[i-1]`, undefined (`NaN`) at `i = 0`.
fn diff(series: &[f64]) -> Vec<f64> {
    (0..series.len())
        .map(|i| if i == 0 { f64::NAN } else { series[i] - series[i - 1] })
        .collect()
}

/// Rate of change and acceleration, both 0 where undefined.
pub(crate) fn rate_and_acceleration(series: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut rate = diff(series);
    let mut acceleration = diff(&rate);
    zero_fill(&mut rate);
    zero_fill(&mut acceleration);
    (rate, acceleration)
}

pub struct RateOfChangeStage {
    channels: Vec<SensorChannel>,
}

impl RateOfChangeStage {
    pub fn new(channels: &[SensorChannel]) -> Self {
        Self {
            channels: channels.to_vec(),
        }
    }
}

impl FeatureStage for RateOfChangeStage {
    fn name(&self) -> &'static str {
        "rate_of_change"
    }

    fn family(&self) -> FeatureFamily {
        FeatureFamily::RateOfChange
    }

    fn compute(
        &self,
        frame: &FeatureFrame,
        _report: &mut DataQualityReport,
    ) -> Result<Vec<FeatureColumn>, FeatureError> {
        let groups = frame.groups();
        let mut columns = Vec::with_capacity(self.channels.len() * 2);
        for &channel in &self.channels {
            let values = frame.channel(channel)?;
            columns.push(FeatureColumn::new(
                format!("{channel}_roc"),
                groups.map_series(values, |s| rate_and_acceleration(s).0),
            ));
            columns.push(FeatureColumn::new(
                format!("{channel}_acceleration"),
                groups.map_series(values, |s| rate_and_acceleration(s).1),
            ));
        }
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_and_acceleration() {
        let (rate, acc) = rate_and_acceleration(&[1.0, 3.0, 7.0, 8.0]);
        assert_eq!(rate, vec![0.0, 2.0, 4.0, 1.0]);
        // acceleration[1] depends on the undefined rate[0]
        assert_eq!(acc, vec![0.0, 0.0, 2.0, -3.0]);
    }

    #[test]
    fn test_single_row() {
        assert_eq!(rate_and_acceleration(&[5.0]), (vec![0.0], vec![0.0]));
    }
}
