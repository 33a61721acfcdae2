//! Per-row risk rules: the composite score and the two threshold predicates.
//!
//! A missing reading (`NaN`) contributes 0 to the score and never satisfies a
//! threshold comparison.

use crate::config::{RiskThresholdConfig, ScoreConfig};
use crate::types::{RiskLevel, SensorChannel};

type Readings = [f64; SensorChannel::COUNT];

#[derive(Debug, Clone, PartialEq)]
pub struct RiskRules {
    thresholds: RiskThresholdConfig,
    score: ScoreConfig,
}

impl RiskRules {
    pub fn new(thresholds: &RiskThresholdConfig, score: &ScoreConfig) -> Self {
        Self {
            thresholds: thresholds.clone(),
            score: score.clone(),
        }
    }

    /// Weighted sum of normalized readings, clipped to [0, 1].
    pub fn failure_probability(&self, readings: &Readings) -> f64 {
        self.score
            .terms()
            .iter()
            .map(|(channel, term)| {
                let value = readings[channel.index()];
                if value.is_nan() {
                    0.0
                } else {
                    term.weight * (value / term.full_scale).clamp(0.0, 1.0)
                }
            })
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }

    pub fn is_high_risk(&self, readings: &Readings) -> bool {
        let get = |ch: SensorChannel| readings[ch.index()];
        let c = &self.thresholds.critical;
        let combined = &self.thresholds.combined;

        get(SensorChannel::GasC2h2) > c.gas_c2h2
            || get(SensorChannel::GasH2) > c.gas_h2
            || get(SensorChannel::GasCh4) > c.gas_ch4
            || get(SensorChannel::TemperatureTop) > c.temperature_top
            || get(SensorChannel::TemperatureOil) > c.temperature_oil
            || get(SensorChannel::VibrationX) > c.vibration
            || get(SensorChannel::VibrationY) > c.vibration
            || (get(SensorChannel::GasC2h2) > combined.critical_gas_c2h2
                && get(SensorChannel::TemperatureTop) > combined.critical_temperature_top)
            || (get(SensorChannel::GasH2) > combined.critical_gas_h2
                && get(SensorChannel::VibrationX) > combined.critical_vibration_x)
    }

    pub fn is_medium_risk(&self, readings: &Readings) -> bool {
        let get = |ch: SensorChannel| readings[ch.index()];
        let w = &self.thresholds.warning;
        let combined = &self.thresholds.combined;

        get(SensorChannel::GasC2h2) > w.gas_c2h2
            || get(SensorChannel::GasH2) > w.gas_h2
            || get(SensorChannel::GasCh4) > w.gas_ch4
            || get(SensorChannel::TemperatureTop) > w.temperature_top
            || get(SensorChannel::TemperatureOil) > w.temperature_oil
            || get(SensorChannel::VibrationX) > w.vibration
            || get(SensorChannel::VibrationY) > w.vibration
            || (get(SensorChannel::GasC2h2) > combined.warning_gas_c2h2
                && get(SensorChannel::TemperatureTop) > combined.warning_temperature_top)
    }

    /// Rule-based level; the high predicate always wins.
    pub fn level(&self, readings: &Readings) -> RiskLevel {
        if self.is_high_risk(readings) {
            RiskLevel::High
        } else if self.is_medium_risk(readings) {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl Default for RiskRules {
    fn default() -> Self {
        Self::new(&RiskThresholdConfig::default(), &ScoreConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(values: &[(SensorChannel, f64)]) -> Readings {
        let mut r = [0.0; SensorChannel::COUNT];
        for &(ch, v) in values {
            r[ch.index()] = v;
        }
        r
    }

    #[test]
    fn test_score_full_scale_is_one() {
        let rules = RiskRules::default();
        let r = readings(&[
            (SensorChannel::GasC2h2, 400.0),
            (SensorChannel::GasH2, 500.0),
            (SensorChannel::GasCh4, 300.0),
            (SensorChannel::TemperatureTop, 150.0),
            (SensorChannel::VibrationX, 10.0),
        ]);
        assert!((rules.failure_probability(&r) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_reading_contributes_zero() {
        let rules = RiskRules::default();
        let mut r = readings(&[(SensorChannel::TemperatureTop, 75.0)]);
        let base = rules.failure_probability(&r);
        r[SensorChannel::GasC2h2.index()] = f64::NAN;
        assert_eq!(rules.failure_probability(&r), base);
        assert!((base - 0.1).abs() < 1e-12);
        assert_eq!(rules.level(&r), RiskLevel::Low);
    }

    #[test]
    fn test_vibration_y_counts_for_both_tiers() {
        let rules = RiskRules::default();
        assert_eq!(rules.level(&readings(&[(SensorChannel::VibrationY, 9.0)])), RiskLevel::High);
        assert_eq!(rules.level(&readings(&[(SensorChannel::VibrationY, 6.0)])), RiskLevel::Medium);
    }

    #[test]
    fn test_combined_rules() {
        let rules = RiskRules::default();
        let high = readings(&[(SensorChannel::GasC2h2, 60.0), (SensorChannel::TemperatureTop, 90.0)]);
        assert_eq!(rules.level(&high), RiskLevel::High);

        let high_h2 = readings(&[(SensorChannel::GasH2, 160.0), (SensorChannel::VibrationX, 6.0)]);
        assert_eq!(rules.level(&high_h2), RiskLevel::High);

        let medium = readings(&[(SensorChannel::GasC2h2, 30.0), (SensorChannel::TemperatureTop, 80.0)]);
        assert_eq!(rules.level(&medium), RiskLevel::Medium);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let rules = RiskRules::default();
        assert_eq!(rules.level(&readings(&[(SensorChannel::GasC2h2, 100.0)])), RiskLevel::Medium);
        assert_eq!(rules.level(&readings(&[(SensorChannel::GasC2h2, 50.0)])), RiskLevel::Low);
    }
}
