//! Binary threshold indicators and their sum, `total_risk_score`.
//!
//! Thresholds come from `[features.domain]`, independent of the risk
//! labeler's rule thresholds.

use super::{FeatureError, FeatureFamily, FeatureStage};
use crate::config::DomainThresholds;
use crate::preprocessing::DataQualityReport;
use crate::types::{FeatureColumn, FeatureFrame, SensorChannel};

pub struct DomainStage {
    thresholds: DomainThresholds,
}

impl DomainStage {
    pub fn new(thresholds: &DomainThresholds) -> Self {
        Self {
            thresholds: thresholds.clone(),
        }
    }

    /// `(column name, channel, threshold)` for every "above threshold" flag.
    fn above_flags(&self) -> [(&'static str, SensorChannel, f64); 12] {
        let t = &self.thresholds;
        [
            ("temp_risk", SensorChannel::TemperatureTop, t.temperature_warning),
            ("temp_critical", SensorChannel::TemperatureTop, t.temperature_critical),
            ("oil_temp_risk", SensorChannel::TemperatureOil, t.oil_temperature_warning),
            ("oil_temp_critical", SensorChannel::TemperatureOil, t.oil_temperature_critical),
            ("vibration_risk", SensorChannel::VibrationX, t.vibration_warning),
            ("vibration_critical", SensorChannel::VibrationX, t.vibration_critical),
            ("gas_c2h2_risk", SensorChannel::GasC2h2, t.gas_c2h2_warning),
            ("gas_c2h2_critical", SensorChannel::GasC2h2, t.gas_c2h2_critical),
            ("gas_h2_risk", SensorChannel::GasH2, t.gas_h2_warning),
            ("gas_h2_critical", SensorChannel::GasH2, t.gas_h2_critical),
            ("gas_ch4_risk", SensorChannel::GasCh4, t.gas_ch4_warning),
            ("gas_ch4_critical", SensorChannel::GasCh4, t.gas_ch4_critical),
        ]
    }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

impl FeatureStage for DomainStage {
    fn name(&self) -> &'static str {
        "domain"
    }

    fn family(&self) -> FeatureFamily {
        FeatureFamily::Domain
    }

    fn compute(
        &self,
        frame: &FeatureFrame,
        _report: &mut DataQualityReport,
    ) -> Result<Vec<FeatureColumn>, FeatureError> {
        let mut columns = Vec::with_capacity(14);
        for (name, channel, threshold) in self.above_flags() {
            let values = frame.channel(channel)?;
            columns.push(FeatureColumn::new(
                name,
                values.iter().map(|&v| flag(v > threshold)).collect(),
            ));
        }

        let phases = [
            frame.channel(SensorChannel::VoltagePhaseA)?,
            frame.channel(SensorChannel::VoltagePhaseB)?,
            frame.channel(SensorChannel::VoltagePhaseC)?,
        ];
        let (lo, hi) = (self.thresholds.voltage_min, self.thresholds.voltage_max);
        let voltage_risk: Vec<f64> = (0..frame.len())
            .map(|row| flag(phases.iter().any(|p| p[row] < lo || p[row] > hi)))
            .collect();
        columns.push(FeatureColumn::new("voltage_risk", voltage_risk));

        let total: Vec<f64> = (0..frame.len())
            .map(|row| columns.iter().map(|c| c.values[row]).sum())
            .collect();
        columns.push(FeatureColumn::new("total_risk_score", total));
        Ok(columns)
    }
}
