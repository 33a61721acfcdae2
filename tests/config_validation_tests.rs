//! Config Validation Tests
//!
//! Typo detection, range validation and load-time rejection, exercised
//! through the public configuration API only.

use grid_guardian::config::validation::{
    known_config_keys, suggest_correction, validate_physical_ranges, validate_unknown_keys,
};
use grid_guardian::config::{BalanceMethod, ConfigError, GuardianConfig, OutlierMethod};
use grid_guardian::types::SensorChannel;

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_labeling_quantile_warns_with_suggestion() {
    let toml_str = r#"
[labeling]
high_quantle = 0.9
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert_eq!(warnings[0].field, "labeling.high_quantle");
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("labeling.high_quantile"),
        "Should suggest the correct spelling"
    );
}

#[test]
fn typo_in_nested_domain_threshold_is_caught() {
    let toml_str = r#"
[features.domain]
voltage_mn = 215.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("features.domain.voltage_min")
    );
}

#[test]
fn unknown_section_warns_without_failing_load() {
    let toml_str = r#"
[telemetry_server]
port = 8080
"#;
    assert!(!validate_unknown_keys(toml_str).is_empty());
    let config = GuardianConfig::from_toml_str(toml_str).expect("unknown keys never fail a load");
    assert_eq!(config, GuardianConfig::default());
}

#[test]
fn malformed_toml_produces_no_key_warnings() {
    assert!(validate_unknown_keys("[generation\nhours = ").is_empty());
}

#[test]
fn suggestion_requires_close_match() {
    let known = known_config_keys();
    assert_eq!(suggest_correction("zzzzzzzzzzzzzz", &known), None);
    assert_eq!(
        suggest_correction("generation.sed", &known).as_deref(),
        Some("generation.seed")
    );
}

#[test]
fn full_default_document_has_only_known_keys() {
    let toml_str = GuardianConfig::default().to_toml().unwrap();
    let warnings = validate_unknown_keys(&toml_str);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn threshold_above_channel_ceiling_warns() {
    let mut config = GuardianConfig::default();
    let (_, max) = SensorChannel::TemperatureTop.physical_range();
    config.thresholds.critical.temperature_top = max + 10.0;
    let (errors, warnings) = validate_physical_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings
        .iter()
        .any(|w| w.field == "thresholds.critical.temperature_top"));
}

#[test]
fn default_config_has_no_range_findings() {
    let (errors, warnings) = validate_physical_ranges(&GuardianConfig::default());
    assert!(errors.is_empty(), "{errors:?}");
    assert!(warnings.is_empty(), "{warnings:?}");
}

// ============================================================================
// Load-time Rejection
// ============================================================================

fn validation_errors(toml_str: &str) -> Vec<String> {
    match GuardianConfig::from_toml_str(toml_str) {
        Err(ConfigError::Validation(errors)) => errors,
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn zero_fleet_rejected() {
    let errors = validation_errors(
        r#"
[generation]
n_substations = 0
"#,
    );
    assert!(errors.iter().any(|e| e.contains("n_substations")));
}

#[test]
fn equipment_id_space_enforced() {
    let errors = validation_errors(
        r#"
[generation]
equipment_per_substation = 100
"#,
    );
    assert!(errors.iter().any(|e| e.contains("two-digit")));
}

#[test]
fn negative_threshold_fails_the_load() {
    let errors = validation_errors(
        r#"
[thresholds.warning]
gas_h2 = -1.0
"#,
    );
    assert!(errors.iter().any(|e| e.contains("warning.gas_h2")));
}

#[test]
fn inverted_quantiles_rejected() {
    let errors = validation_errors(
        r#"
[labeling]
high_quantile = 0.5
medium_quantile = 0.75
"#,
    );
    assert!(errors.iter().any(|e| e.contains("quantiles")));
}

#[test]
fn balance_ratio_out_of_range_rejected() {
    let errors = validation_errors(
        r#"
[preprocessing]
balance_ratio = 1.5
"#,
    );
    assert!(errors.iter().any(|e| e.contains("balance_ratio")));
}

#[test]
fn every_error_is_reported_at_once() {
    let errors = validation_errors(
        r#"
[generation]
hours = 0
degradation_probability = 2.0

[output]
compression_level = 0
"#,
    );
    assert!(errors.len() >= 3, "{errors:?}");
}

#[test]
fn unknown_enum_variant_is_parse_error() {
    let result = GuardianConfig::from_toml_str(
        r#"
[preprocessing]
outlier_method = "winsorize"
"#,
    );
    assert!(matches!(result, Err(ConfigError::Parse(..))));
}

#[test]
fn preprocessing_methods_parse_from_snake_case() {
    let config = GuardianConfig::from_toml_str(
        r#"
[preprocessing]
outlier_method = "zscore"
balance_method = "undersample"
"#,
    )
    .unwrap();
    assert_eq!(config.preprocessing.outlier_method, OutlierMethod::Zscore);
    assert_eq!(config.preprocessing.balance_method, BalanceMethod::Undersample);
}

#[test]
fn saved_config_loads_back_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid_guardian.toml");
    let mut config = GuardianConfig::default();
    config.generation.seed = 7;
    config.features.rolling_windows = vec![3, 12];
    config.save_to_file(&path).unwrap();
    assert_eq!(GuardianConfig::load_from_file(&path).unwrap(), config);
}

#[test]
fn missing_file_is_io_error() {
    let result = GuardianConfig::load_from_file(std::path::Path::new("/nonexistent/grid.toml"));
    assert!(matches!(result, Err(ConfigError::Io(..))));
}
