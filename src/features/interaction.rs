//! Products and ratios of physically related channels.

use super::{FeatureError, FeatureFamily, FeatureStage};
use crate::config::defaults::RATIO_EPSILON;
use crate::preprocessing::DataQualityReport;
use crate::types::{FeatureColumn, FeatureFrame, SensorChannel};

pub struct InteractionStage {
    reference_temperature: f64,
}

impl InteractionStage {
    pub const fn new(reference_temperature: f64) -> Self {
        Self {
            reference_temperature,
        }
    }
}

fn zip_with(a: &[f64], b: &[f64], f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

impl FeatureStage for InteractionStage {
    fn name(&self) -> &'static str {
        "interaction"
    }

    fn family(&self) -> FeatureFamily {
        FeatureFamily::Interaction
    }

    fn compute(
        &self,
        frame: &FeatureFrame,
        _report: &mut DataQualityReport,
    ) -> Result<Vec<FeatureColumn>, FeatureError> {
        let temperature = frame.channel(SensorChannel::TemperatureTop)?;
        let oil = frame.channel(SensorChannel::TemperatureOil)?;
        let vibration = frame.channel(SensorChannel::VibrationX)?;
        let current = frame.channel(SensorChannel::CurrentPhaseA)?;
        let voltage = frame.channel(SensorChannel::VoltagePhaseA)?;
        let c2h2 = frame.channel(SensorChannel::GasC2h2)?;
        let h2 = frame.channel(SensorChannel::GasH2)?;

        let reference = self.reference_temperature;
        Ok(vec![
            FeatureColumn::new(
                "temp_vibration_interaction",
                zip_with(temperature, vibration, |t, v| t * v),
            ),
            FeatureColumn::new(
                "current_voltage_interaction",
                zip_with(current, voltage, |i, u| i * u),
            ),
            FeatureColumn::new(
                "temp_deviation",
                temperature.iter().map(|t| (t - reference).abs()).collect(),
            ),
            // Acetylene relative to hydrogen: arcing vs. partial discharge
            FeatureColumn::new(
                "gas_c2h2_h2_ratio",
                zip_with(c2h2, h2, |a, b| a / (b + RATIO_EPSILON)),
            ),
            FeatureColumn::new("oil_temperature_gradient", zip_with(temperature, oil, |t, o| t - o)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EquipmentId;
    use chrono::NaiveDate;

    #[test]
    fn test_interactions() {
        let ts = NaiveDate::from_ymd_opt(2023, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let mut table = crate::types::TelemetryTable::new();
        let mut readings = [0.0; SensorChannel::COUNT];
        readings[SensorChannel::TemperatureTop.index()] = 60.0;
        readings[SensorChannel::TemperatureOil.index()] = 50.0;
        readings[SensorChannel::VibrationX.index()] = 2.0;
        readings[SensorChannel::CurrentPhaseA.index()] = 100.0;
        readings[SensorChannel::VoltagePhaseA.index()] = 230.0;
        readings[SensorChannel::GasC2h2.index()] = 9.0;
        readings[SensorChannel::GasH2.index()] = 0.0;
        table.push(crate::types::TelemetryRecord {
            timestamp: ts,
            equipment_id: EquipmentId::new(1, 1),
            readings,
        });
        let frame = FeatureFrame::from_telemetry(&table);

        let cols = InteractionStage::new(65.0)
            .compute(&frame, &mut DataQualityReport::new())
            .unwrap();
        let get = |name: &str| cols.iter().find(|c| c.name == name).unwrap().values[0];
        assert_eq!(get("temp_vibration_interaction"), 120.0);
        assert_eq!(get("current_voltage_interaction"), 23_000.0);
        assert_eq!(get("temp_deviation"), 5.0);
        assert_eq!(get("gas_c2h2_h2_ratio"), 9.0);
        assert_eq!(get("oil_temperature_gradient"), 10.0);
    }
}
