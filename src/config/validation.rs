//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse: the raw TOML is first walked as a `toml::Value` tree and
//! every dotted key compared against the known field names, producing "did you
//! mean?" warnings. Normal serde deserialization follows. Warnings never break
//! an existing config.

use std::collections::HashSet;

use crate::types::SensorChannel;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `GuardianConfig`.
///
/// Maintained by hand to match the struct hierarchy in guardian_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [generation]
        "generation",
        "generation.n_substations",
        "generation.equipment_per_substation",
        "generation.hours",
        "generation.batch_size_hours",
        "generation.degradation_probability",
        "generation.onset_min_hours",
        "generation.onset_max_hours",
        "generation.failure_window_start",
        "generation.start_time",
        "generation.seed",
        // [thresholds]
        "thresholds",
        "thresholds.critical",
        "thresholds.critical.gas_c2h2",
        "thresholds.critical.gas_h2",
        "thresholds.critical.gas_ch4",
        "thresholds.critical.temperature_top",
        "thresholds.critical.temperature_oil",
        "thresholds.critical.vibration",
        "thresholds.warning",
        "thresholds.warning.gas_c2h2",
        "thresholds.warning.gas_h2",
        "thresholds.warning.gas_ch4",
        "thresholds.warning.temperature_top",
        "thresholds.warning.temperature_oil",
        "thresholds.warning.vibration",
        "thresholds.combined",
        "thresholds.combined.critical_gas_c2h2",
        "thresholds.combined.critical_temperature_top",
        "thresholds.combined.critical_gas_h2",
        "thresholds.combined.critical_vibration_x",
        "thresholds.combined.warning_gas_c2h2",
        "thresholds.combined.warning_temperature_top",
        // [score_weights]
        "score_weights",
        "score_weights.gas_c2h2",
        "score_weights.gas_c2h2.weight",
        "score_weights.gas_c2h2.full_scale",
        "score_weights.gas_h2",
        "score_weights.gas_h2.weight",
        "score_weights.gas_h2.full_scale",
        "score_weights.gas_ch4",
        "score_weights.gas_ch4.weight",
        "score_weights.gas_ch4.full_scale",
        "score_weights.temperature_top",
        "score_weights.temperature_top.weight",
        "score_weights.temperature_top.full_scale",
        "score_weights.vibration_x",
        "score_weights.vibration_x.weight",
        "score_weights.vibration_x.full_scale",
        // [labeling]
        "labeling",
        "labeling.high_quantile",
        "labeling.medium_quantile",
        // [preprocessing]
        "preprocessing",
        "preprocessing.outlier_method",
        "preprocessing.iqr_multiplier",
        "preprocessing.zscore_threshold",
        "preprocessing.balance_method",
        "preprocessing.balance_ratio",
        "preprocessing.low_failure_rate",
        // [features]
        "features",
        "features.rolling_windows",
        "features.lag_hours",
        "features.rolling_channels",
        "features.lag_channels",
        "features.rate_of_change_channels",
        "features.statistics_channels",
        "features.reference_temperature",
        "features.one_hot_equipment",
        "features.max_one_hot_cardinality",
        // [features.domain]
        "features.domain",
        "features.domain.temperature_warning",
        "features.domain.temperature_critical",
        "features.domain.oil_temperature_warning",
        "features.domain.oil_temperature_critical",
        "features.domain.vibration_warning",
        "features.domain.vibration_critical",
        "features.domain.gas_c2h2_warning",
        "features.domain.gas_c2h2_critical",
        "features.domain.gas_h2_warning",
        "features.domain.gas_h2_critical",
        "features.domain.gas_ch4_warning",
        "features.domain.gas_ch4_critical",
        "features.domain.voltage_min",
        "features.domain.voltage_max",
        // [output]
        "output",
        "output.data_dir",
        "output.raw_telemetry",
        "output.locations",
        "output.cleaned",
        "output.features",
        "output.dashboard_sample",
        "output.dashboard_sample_rows",
        "output.compression_level",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smallest key so the suggestion does
/// not depend on `HashSet` iteration order.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Never fails: parse errors are reported later by serde.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate physical ranges on a parsed `GuardianConfig`.
///
/// Returns (errors, warnings): errors are impossible values that must prevent
/// a run; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::GuardianConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let t = &config.thresholds;
    let thresholds = [
        ("critical.gas_c2h2", SensorChannel::GasC2h2, t.critical.gas_c2h2),
        ("critical.gas_h2", SensorChannel::GasH2, t.critical.gas_h2),
        ("critical.gas_ch4", SensorChannel::GasCh4, t.critical.gas_ch4),
        ("critical.temperature_top", SensorChannel::TemperatureTop, t.critical.temperature_top),
        ("critical.temperature_oil", SensorChannel::TemperatureOil, t.critical.temperature_oil),
        ("critical.vibration", SensorChannel::VibrationX, t.critical.vibration),
        ("warning.gas_c2h2", SensorChannel::GasC2h2, t.warning.gas_c2h2),
        ("warning.gas_h2", SensorChannel::GasH2, t.warning.gas_h2),
        ("warning.gas_ch4", SensorChannel::GasCh4, t.warning.gas_ch4),
        ("warning.temperature_top", SensorChannel::TemperatureTop, t.warning.temperature_top),
        ("warning.temperature_oil", SensorChannel::TemperatureOil, t.warning.temperature_oil),
        ("warning.vibration", SensorChannel::VibrationX, t.warning.vibration),
    ];

    for (name, channel, value) in thresholds {
        let (_, max) = channel.physical_range();
        if value < 0.0 {
            errors.push(format!(
                "thresholds.{name} = {value:.1} cannot be negative"
            ));
        } else if value >= max {
            // Synthesized values are clipped to the channel range, so the
            // rule can never fire on generated data
            warnings.push(ValidationWarning {
                field: format!("thresholds.{name}"),
                message: format!(
                    "thresholds.{name} = {value:.1} is at or above the {channel} ceiling ({max:.0}) and can never trigger"
                ),
                suggestion: None,
            });
        }
    }

    let d = &config.features.domain;
    let (v_lo, v_hi) = SensorChannel::VoltagePhaseA.physical_range();
    if d.voltage_min < v_lo || d.voltage_max > v_hi {
        warnings.push(ValidationWarning {
            field: "features.domain.voltage_min".to_string(),
            message: format!(
                "voltage band [{:.0}, {:.0}] extends past the physical range [{v_lo:.0}, {v_hi:.0}]",
                d.voltage_min, d.voltage_max
            ),
            suggestion: None,
        });
    }

    let g = &config.generation;
    if g.onset_max_hours > g.hours && g.hours > 0 {
        warnings.push(ValidationWarning {
            field: "generation.onset_max_hours".to_string(),
            message: format!(
                "onset_max_hours = {} exceeds the run length ({} h); most ramps will be clamped to hour 0",
                g.onset_max_hours, g.hours
            ),
            suggestion: None,
        });
    }

    let units = g.equipment_count();
    if config.features.one_hot_equipment && units > config.features.max_one_hot_cardinality {
        warnings.push(ValidationWarning {
            field: "features.max_one_hot_cardinality".to_string(),
            message: format!(
                "{units} equipment units exceed max_one_hot_cardinality ({}); one-hot encoding will be skipped",
                config.features.max_one_hot_cardinality
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardianConfig;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("hello", "hello"), 0);
        assert_eq!(levenshtein("vibraton", "vibration"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [thresholds]
            [thresholds.critical]
            gas_c2h2 = 100.0
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"thresholds".to_string()));
        assert!(keys.contains(&"thresholds.critical".to_string()));
        assert!(keys.contains(&"thresholds.critical.gas_c2h2".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[generation]
n_substatons = 3
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "generation.n_substatons");
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("generation.n_substations")
        );
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[generation]
hours = 48
seed = 1

[score_weights.gas_c2h2]
weight = 0.25
full_scale = 200.0

[features.domain]
voltage_min = 221.0
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {warnings:?}");
    }

    #[test]
    fn test_default_serialization_only_uses_known_keys() {
        let text = GuardianConfig::default().to_toml().unwrap();
        let warnings = validate_unknown_keys(&text);
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_physical_range_defaults_clean() {
        let (errors, warnings) = validate_physical_ranges(&GuardianConfig::default());
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_negative_threshold_is_error() {
        let mut config = GuardianConfig::default();
        config.thresholds.warning.gas_h2 = -1.0;
        let (errors, _) = validate_physical_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("warning.gas_h2")));
    }

    #[test]
    fn test_unreachable_threshold_warns() {
        let mut config = GuardianConfig::default();
        config.thresholds.critical.gas_c2h2 = 250.0;
        let (errors, warnings) = validate_physical_ranges(&config);
        assert!(errors.is_empty());
        assert!(warnings.iter().any(|w| w.field == "thresholds.critical.gas_c2h2"));
    }

    #[test]
    fn test_large_fleet_warns_about_one_hot() {
        let mut config = GuardianConfig::default();
        config.generation.n_substations = 50;
        config.generation.equipment_per_substation = 20;
        let (_, warnings) = validate_physical_ranges(&config);
        assert!(warnings.iter().any(|w| w.field.contains("one_hot")));
    }
}
