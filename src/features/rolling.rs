//! Trailing window statistics per equipment unit.
//!
//! Windows are row-count windows over the unit's time-ordered series with a
//! minimum of one observation, so the first row of a unit reports its own
//! value as mean, min and max and 0 as standard deviation.

use rayon::prelude::*;

use super::{FeatureError, FeatureFamily, FeatureStage};
use crate::preprocessing::DataQualityReport;
use crate::types::{FeatureColumn, FeatureFrame, SensorChannel};

/// Mean, sample std, min and max of each trailing window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollingWindow {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

/// Trailing statistics of `series` over `window` rows (`min_periods = 1`).
pub fn rolling_window(series: &[f64], window: usize) -> RollingWindow {
    let window = window.max(1);
    let mut out = RollingWindow {
        mean: Vec::with_capacity(series.len()),
        std: Vec::with_capacity(series.len()),
        min: Vec::with_capacity(series.len()),
        max: Vec::with_capacity(series.len()),
    };

    for i in 0..series.len() {
        let slice = &series[(i + 1).saturating_sub(window)..=i];
        let n = slice.len() as f64;
        let mean = slice.iter().sum::<f64>() / n;
        let std = if slice.len() < 2 {
            0.0
        } else {
            (slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        };
        out.mean.push(mean);
        out.std.push(std);
        out.min.push(slice.iter().copied().fold(f64::INFINITY, f64::min));
        out.max.push(slice.iter().copied().fold(f64::NEG_INFINITY, f64::max));
    }
    out
}

pub struct RollingStage {
    channels: Vec<SensorChannel>,
    windows: Vec<usize>,
}

impl RollingStage {
    pub fn new(channels: &[SensorChannel], windows: &[usize]) -> Self {
        Self {
            channels: channels.to_vec(),
            windows: windows.to_vec(),
        }
    }
}

impl FeatureStage for RollingStage {
    fn name(&self) -> &'static str {
        "rolling"
    }

    fn family(&self) -> FeatureFamily {
        FeatureFamily::Rolling
    }

    fn compute(
        &self,
        frame: &FeatureFrame,
        _report: &mut DataQualityReport,
    ) -> Result<Vec<FeatureColumn>, FeatureError> {
        let groups = frame.groups();
        let runs: Vec<&[usize]> = groups.iter().collect();
        let n = frame.len();
        let mut columns = Vec::with_capacity(self.channels.len() * self.windows.len() * 4);

        for &channel in &self.channels {
            let values = frame.channel(channel)?;
            for &window in &self.windows {
                let per_unit: Vec<RollingWindow> = runs
                    .par_iter()
                    .map(|rows| {
                        let series: Vec<f64> = rows.iter().map(|&r| values[r]).collect();
                        rolling_window(&series, window)
                    })
                    .collect();

                let mut out = RollingWindow {
                    mean: vec![f64::NAN; n],
                    std: vec![f64::NAN; n],
                    min: vec![f64::NAN; n],
                    max: vec![f64::NAN; n],
                };
                for (rows, w) in runs.iter().zip(per_unit) {
                    for (k, &row) in rows.iter().enumerate() {
                        out.mean[row] = w.mean[k];
                        out.std[row] = w.std[k];
                        out.min[row] = w.min[k];
                        out.max[row] = w.max[k];
                    }
                }

                columns.push(FeatureColumn::new(format!("{channel}_rolling_mean_{window}h"), out.mean));
                columns.push(FeatureColumn::new(format!("{channel}_rolling_std_{window}h"), out.std));
                columns.push(FeatureColumn::new(format!("{channel}_rolling_min_{window}h"), out.min));
                columns.push(FeatureColumn::new(format!("{channel}_rolling_max_{window}h"), out.max));
            }
        }
        Ok(columns)
    }
}
