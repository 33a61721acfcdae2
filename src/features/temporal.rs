//! Calendar features and their cyclical encodings.

use chrono::{Datelike, Timelike};
use std::f64::consts::TAU;

use super::{FeatureError, FeatureFamily, FeatureStage};
use crate::preprocessing::DataQualityReport;
use crate::types::{FeatureColumn, FeatureFrame};

pub struct TemporalStage;

impl FeatureStage for TemporalStage {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn family(&self) -> FeatureFamily {
        FeatureFamily::Temporal
    }

    fn compute(
        &self,
        frame: &FeatureFrame,
        _report: &mut DataQualityReport,
    ) -> Result<Vec<FeatureColumn>, FeatureError> {
        let n = frame.len();
        let mut hour = Vec::with_capacity(n);
        let mut day_of_week = Vec::with_capacity(n);
        let mut month = Vec::with_capacity(n);

        for ts in frame.timestamps() {
            hour.push(f64::from(ts.hour()));
            // Monday = 0
            day_of_week.push(f64::from(ts.weekday().num_days_from_monday()));
            month.push(f64::from(ts.month()));
        }

        let is_weekend = day_of_week.iter().map(|&d| if d >= 5.0 { 1.0 } else { 0.0 }).collect();
        let cyclic = |values: &[f64], period: f64, f: fn(f64) -> f64| -> Vec<f64> {
            values.iter().map(|&v| f(TAU * v / period)).collect()
        };
        let hour_sin = cyclic(&hour, 24.0, f64::sin);
        let hour_cos = cyclic(&hour, 24.0, f64::cos);
        let day_sin = cyclic(&day_of_week, 7.0, f64::sin);
        let day_cos = cyclic(&day_of_week, 7.0, f64::cos);

        Ok(vec![
            FeatureColumn::new("hour", hour),
            FeatureColumn::new("day_of_week", day_of_week),
            FeatureColumn::new("month", month),
            FeatureColumn::new("is_weekend", is_weekend),
            FeatureColumn::new("hour_sin", hour_sin),
            FeatureColumn::new("hour_cos", hour_cos),
            FeatureColumn::new("day_sin", day_sin),
            FeatureColumn::new("day_cos", day_cos),
        ])
    }
}
