//! Guardian Configuration - every generation, labeling and feature parameter
//!
//! Each struct implements `Default` with the reference values of the
//! demonstrator, so an empty or partial TOML file always yields a complete,
//! valid configuration.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::types::SensorChannel;

use super::defaults;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "GRID_GUARDIAN_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "grid_guardian.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a generation / labeling / feature run.
///
/// Load with `GuardianConfig::load()` which searches:
/// 1. `$GRID_GUARDIAN_CONFIG` env var
/// 2. `./grid_guardian.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GuardianConfig {
    /// Fleet size, time range, degradation model and seed
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Rule thresholds of the risk labeler
    #[serde(default)]
    pub thresholds: RiskThresholdConfig,

    /// Composite failure-probability score terms
    #[serde(default)]
    pub score_weights: ScoreConfig,

    /// Quantile fallback of the risk labeler
    #[serde(default)]
    pub labeling: LabelingConfig,

    /// Cleaning, outlier capping and class balancing
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,

    /// Feature engineering windows, lags and channel selections
    #[serde(default)]
    pub features: FeatureConfig,

    /// Artifact locations
    #[serde(default)]
    pub output: OutputConfig,
}

impl GuardianConfig {
    /// Load configuration using the standard search order:
    /// 1. `$GRID_GUARDIAN_CONFIG` environment variable
    /// 2. `./grid_guardian.toml` in the current working directory
    /// 3. Built-in defaults
    ///
    /// A file that exists but fails to parse or validate is an error: running
    /// with silently substituted defaults would produce a different dataset.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                let config = Self::load_from_file(&p)?;
                info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV_VAR);
                return Ok(config);
            }
            warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            let config = Self::load_from_file(&local)?;
            info!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
            return Ok(config);
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Ok(Self::default())
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are reported as warnings with suggestions; they never fail
    /// the load.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(&config);
        for w in range_warnings {
            warn!("{}", w);
        }
        if !range_errors.is_empty() {
            return Err(ConfigError::Validation(range_errors));
        }
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Validate all parameters for internal consistency.
    ///
    /// Every violation is collected so the operator sees the full list at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        self.generation.collect_errors(&mut errors);

        let t = &self.thresholds;
        let pairs = [
            ("gas_c2h2", t.warning.gas_c2h2, t.critical.gas_c2h2),
            ("gas_h2", t.warning.gas_h2, t.critical.gas_h2),
            ("gas_ch4", t.warning.gas_ch4, t.critical.gas_ch4),
            ("temperature_top", t.warning.temperature_top, t.critical.temperature_top),
            ("temperature_oil", t.warning.temperature_oil, t.critical.temperature_oil),
            ("vibration", t.warning.vibration, t.critical.vibration),
        ];
        for (name, warning, critical) in pairs {
            Self::check_escalation(warning, critical, &format!("thresholds.{name}"), &mut errors);
        }
        Self::check_escalation(
            t.combined.warning_gas_c2h2,
            t.combined.critical_gas_c2h2,
            "thresholds.combined.gas_c2h2",
            &mut errors,
        );
        Self::check_escalation(
            t.combined.warning_temperature_top,
            t.combined.critical_temperature_top,
            "thresholds.combined.temperature_top",
            &mut errors,
        );

        // Score weights: should sum to ~1.0 (allow 0.95-1.05)
        let weight_sum: f64 = self.score_weights.terms().iter().map(|(_, term)| term.weight).sum();
        if !(0.95..=1.05).contains(&weight_sum) {
            errors.push(format!("score weights must sum to ~1.0, got {weight_sum:.2}"));
        }
        for (name, term) in self.score_weights.terms() {
            if !term.weight.is_finite() || term.weight < 0.0 {
                errors.push(format!("score.{name}.weight must be finite and >= 0"));
            }
            if !term.full_scale.is_finite() || term.full_scale <= 0.0 {
                errors.push(format!(
                    "score.{name}.full_scale = {} must be > 0 (used as divisor)",
                    term.full_scale
                ));
            }
        }

        let l = &self.labeling;
        if !(0.0 < l.medium_quantile && l.medium_quantile < l.high_quantile && l.high_quantile < 1.0)
        {
            errors.push(format!(
                "labeling quantiles must satisfy 0 < medium ({}) < high ({}) < 1",
                l.medium_quantile, l.high_quantile
            ));
        }

        let p = &self.preprocessing;
        if !p.iqr_multiplier.is_finite() || p.iqr_multiplier <= 0.0 {
            errors.push("preprocessing.iqr_multiplier must be > 0".to_string());
        }
        if !p.zscore_threshold.is_finite() || p.zscore_threshold <= 0.0 {
            errors.push("preprocessing.zscore_threshold must be > 0".to_string());
        }
        if !(p.balance_ratio > 0.0 && p.balance_ratio <= 1.0) {
            errors.push(format!(
                "preprocessing.balance_ratio = {} must be in (0, 1]",
                p.balance_ratio
            ));
        }

        self.features.collect_errors(&mut errors);

        if !(1..=22).contains(&self.output.compression_level) {
            errors.push(format!(
                "output.compression_level = {} must be in 1..=22",
                self.output.compression_level
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_escalation(warning: f64, critical: f64, name: &str, errors: &mut Vec<String>) {
        // NaN/Inf comparisons silently pass, catch them explicitly
        if !warning.is_finite() || !critical.is_finite() {
            errors.push(format!(
                "{name}: values must be finite (got warning={warning}, critical={critical})"
            ));
            return;
        }
        if critical < warning {
            errors.push(format!(
                "{name}: critical ({critical:.3}) must be >= warning ({warning:.3})"
            ));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Generation
// ============================================================================

/// Fleet size, time range and degradation model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Number of substations
    pub n_substations: usize,
    /// Equipment units per substation
    pub equipment_per_substation: usize,
    /// Hours of hourly telemetry per unit
    pub hours: usize,
    /// Hours synthesized per batch (168 = one week)
    pub batch_size_hours: usize,
    /// Probability that a unit degrades and fails during the run
    pub degradation_probability: f64,
    /// Shortest degradation ramp before failure (hours)
    pub onset_min_hours: usize,
    /// Upper bound (exclusive) of the degradation ramp (hours)
    pub onset_max_hours: usize,
    /// Earliest failure hour as a fraction of the run
    pub failure_window_start: f64,
    /// Timestamp of hour 0
    pub start_time: NaiveDateTime,
    /// Run seed; every stochastic draw derives from it
    pub seed: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            n_substations: defaults::N_SUBSTATIONS,
            equipment_per_substation: defaults::EQUIPMENT_PER_SUBSTATION,
            hours: defaults::HOURS,
            batch_size_hours: defaults::BATCH_SIZE_HOURS,
            degradation_probability: defaults::DEGRADATION_PROBABILITY,
            onset_min_hours: defaults::ONSET_MIN_HOURS,
            onset_max_hours: defaults::ONSET_MAX_HOURS,
            failure_window_start: defaults::FAILURE_WINDOW_START,
            start_time: default_start_time(),
            seed: defaults::SEED,
        }
    }
}

fn default_start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

impl GenerationConfig {
    pub const fn equipment_count(&self) -> usize {
        self.n_substations * self.equipment_per_substation
    }

    pub const fn total_rows(&self) -> usize {
        self.equipment_count() * self.hours
    }

    fn collect_errors(&self, errors: &mut Vec<String>) {
        if self.n_substations == 0 {
            errors.push("generation.n_substations must be > 0".to_string());
        }
        if self.equipment_per_substation == 0 {
            errors.push("generation.equipment_per_substation must be > 0".to_string());
        }
        if self.equipment_per_substation > 99 {
            errors.push(format!(
                "generation.equipment_per_substation = {} exceeds the two-digit id space (99)",
                self.equipment_per_substation
            ));
        }
        if self.hours == 0 {
            errors.push("generation.hours must be > 0".to_string());
        }
        if self.batch_size_hours == 0 {
            errors.push("generation.batch_size_hours must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.degradation_probability) {
            errors.push(format!(
                "generation.degradation_probability = {} must be in [0, 1]",
                self.degradation_probability
            ));
        }
        if self.onset_min_hours >= self.onset_max_hours {
            errors.push(format!(
                "generation.onset_min_hours ({}) must be < onset_max_hours ({})",
                self.onset_min_hours, self.onset_max_hours
            ));
        }
        if !(0.0..1.0).contains(&self.failure_window_start) {
            errors.push(format!(
                "generation.failure_window_start = {} must be in [0, 1)",
                self.failure_window_start
            ));
        }
    }
}

// ============================================================================
// Risk Thresholds
// ============================================================================

/// Rule thresholds of the risk labeler.
///
/// The literal values are kept for behavioral parity with the reference
/// demonstrator; they are hand-tuned, not calibrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RiskThresholdConfig {
    #[serde(default)]
    pub critical: CriticalLimits,
    #[serde(default)]
    pub warning: WarningLimits,
    #[serde(default)]
    pub combined: CombinedRules,
}

/// Any single value above these marks a row high risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalLimits {
    pub gas_c2h2: f64,
    pub gas_h2: f64,
    pub gas_ch4: f64,
    pub temperature_top: f64,
    pub temperature_oil: f64,
    /// Applies to both horizontal vibration axes
    pub vibration: f64,
}

impl Default for CriticalLimits {
    fn default() -> Self {
        Self {
            gas_c2h2: 100.0,
            gas_h2: 300.0,
            gas_ch4: 200.0,
            temperature_top: 100.0,
            temperature_oil: 90.0,
            vibration: 8.0,
        }
    }
}

/// Any single value above these marks a row medium risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningLimits {
    pub gas_c2h2: f64,
    pub gas_h2: f64,
    pub gas_ch4: f64,
    pub temperature_top: f64,
    pub temperature_oil: f64,
    /// Applies to both horizontal vibration axes
    pub vibration: f64,
}

impl Default for WarningLimits {
    fn default() -> Self {
        Self {
            gas_c2h2: 50.0,
            gas_h2: 150.0,
            gas_ch4: 100.0,
            temperature_top: 85.0,
            temperature_oil: 75.0,
            vibration: 5.0,
        }
    }
}

/// Conjunctive rules: both conditions must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinedRules {
    /// High risk: gas_c2h2 above this AND temperature_top above `critical_temperature_top`
    pub critical_gas_c2h2: f64,
    pub critical_temperature_top: f64,
    /// High risk: gas_h2 above this AND vibration_x above `critical_vibration_x`
    pub critical_gas_h2: f64,
    pub critical_vibration_x: f64,
    /// Medium risk: gas_c2h2 above this AND temperature_top above `warning_temperature_top`
    pub warning_gas_c2h2: f64,
    pub warning_temperature_top: f64,
}

impl Default for CombinedRules {
    fn default() -> Self {
        Self {
            critical_gas_c2h2: 50.0,
            critical_temperature_top: 85.0,
            critical_gas_h2: 150.0,
            critical_vibration_x: 5.0,
            warning_gas_c2h2: 25.0,
            warning_temperature_top: 75.0,
        }
    }
}

// ============================================================================
// Failure-Probability Score
// ============================================================================

/// One term of the composite score: `weight * clip01(value / full_scale)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreTerm {
    pub weight: f64,
    pub full_scale: f64,
}

impl ScoreTerm {
    pub const fn new(weight: f64, full_scale: f64) -> Self {
        Self { weight, full_scale }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub gas_c2h2: ScoreTerm,
    pub gas_h2: ScoreTerm,
    pub gas_ch4: ScoreTerm,
    pub temperature_top: ScoreTerm,
    pub vibration_x: ScoreTerm,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            gas_c2h2: ScoreTerm::new(0.25, 200.0),
            gas_h2: ScoreTerm::new(0.20, 500.0),
            gas_ch4: ScoreTerm::new(0.15, 300.0),
            temperature_top: ScoreTerm::new(0.20, 150.0),
            vibration_x: ScoreTerm::new(0.20, 10.0),
        }
    }
}

impl ScoreConfig {
    /// Terms paired with their source channel.
    pub fn terms(&self) -> [(SensorChannel, ScoreTerm); 5] {
        [
            (SensorChannel::GasC2h2, self.gas_c2h2),
            (SensorChannel::GasH2, self.gas_h2),
            (SensorChannel::GasCh4, self.gas_ch4),
            (SensorChannel::TemperatureTop, self.temperature_top),
            (SensorChannel::VibrationX, self.vibration_x),
        ]
    }
}

// ============================================================================
// Labeling
// ============================================================================

/// Quantile fallback used when no row satisfies a high-risk rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    /// Rows at or above this score quantile become high risk
    pub high_quantile: f64,
    /// Rows at or above this quantile (and below `high_quantile`) become medium risk
    pub medium_quantile: f64,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            high_quantile: 0.95,
            medium_quantile: 0.75,
        }
    }
}

// ============================================================================
// Preprocessing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Cap at Q1 - k*IQR / Q3 + k*IQR
    #[default]
    Iqr,
    /// Cap at mean ± z*std
    Zscore,
    /// Leave values untouched
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BalanceMethod {
    #[default]
    None,
    /// Keep all failures, sample non-failures down to `failures / ratio`
    Undersample,
    /// Replicate failures up to `non_failures * ratio`
    Oversample,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub outlier_method: OutlierMethod,
    pub iqr_multiplier: f64,
    pub zscore_threshold: f64,
    pub balance_method: BalanceMethod,
    pub balance_ratio: f64,
    /// Failure rates below this raise a data-quality warning
    pub low_failure_rate: f64,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            outlier_method: OutlierMethod::Iqr,
            iqr_multiplier: 1.5,
            zscore_threshold: 3.0,
            balance_method: BalanceMethod::None,
            balance_ratio: 0.3,
            low_failure_rate: 0.01,
        }
    }
}

// ============================================================================
// Features
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Trailing window sizes (hours) for rolling statistics
    pub rolling_windows: Vec<usize>,
    /// Lags (hours) for lag features
    pub lag_hours: Vec<usize>,
    pub rolling_channels: Vec<SensorChannel>,
    pub lag_channels: Vec<SensorChannel>,
    pub rate_of_change_channels: Vec<SensorChannel>,
    pub statistics_channels: Vec<SensorChannel>,
    /// Reference temperature for `temp_deviation` (°C)
    pub reference_temperature: f64,
    /// Emit one-hot equipment indicators
    pub one_hot_equipment: bool,
    /// Above this many distinct units the one-hot stage is skipped with a warning
    pub max_one_hot_cardinality: usize,
    pub domain: DomainThresholds,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        use SensorChannel::*;
        Self {
            rolling_windows: vec![3, 6, 12, 24],
            lag_hours: vec![1, 3, 6, 12],
            rolling_channels: vec![
                TemperatureTop,
                TemperatureOil,
                VibrationX,
                CurrentPhaseA,
                VoltagePhaseA,
                GasH2,
                GasC2h2,
                Humidity,
            ],
            lag_channels: vec![TemperatureTop, VibrationX, CurrentPhaseA, VoltagePhaseA],
            rate_of_change_channels: vec![TemperatureTop, VibrationX, CurrentPhaseA, VoltagePhaseA],
            statistics_channels: vec![TemperatureTop, VibrationX, CurrentPhaseA, VoltagePhaseA],
            reference_temperature: 65.0,
            one_hot_equipment: true,
            max_one_hot_cardinality: defaults::MAX_ONE_HOT_CARDINALITY,
            domain: DomainThresholds::default(),
        }
    }
}

impl FeatureConfig {
    fn collect_errors(&self, errors: &mut Vec<String>) {
        if self.rolling_windows.is_empty() {
            errors.push("features.rolling_windows must not be empty".to_string());
        }
        if self.rolling_windows.contains(&0) {
            errors.push("features.rolling_windows entries must be > 0".to_string());
        }
        if self.lag_hours.is_empty() {
            errors.push("features.lag_hours must not be empty".to_string());
        }
        if self.lag_hours.contains(&0) {
            errors.push("features.lag_hours entries must be > 0".to_string());
        }
        for (name, list) in [
            ("rolling_channels", &self.rolling_channels),
            ("lag_channels", &self.lag_channels),
            ("rate_of_change_channels", &self.rate_of_change_channels),
            ("statistics_channels", &self.statistics_channels),
        ] {
            if list.is_empty() {
                errors.push(format!("features.{name} must not be empty"));
            }
        }
        if !self.reference_temperature.is_finite() {
            errors.push("features.reference_temperature must be finite".to_string());
        }
        let d = &self.domain;
        for (name, warning, critical) in d.escalations() {
            GuardianConfig::check_escalation(
                warning,
                critical,
                &format!("features.domain.{name}"),
                errors,
            );
        }
        if d.voltage_min >= d.voltage_max {
            errors.push(format!(
                "features.domain.voltage_min ({}) must be < voltage_max ({})",
                d.voltage_min, d.voltage_max
            ));
        }
    }
}

/// Thresholds of the binary domain indicator features.
///
/// Deliberately separate from [`RiskThresholdConfig`]: the model receives
/// explicit binary cues alongside the continuous label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainThresholds {
    pub temperature_warning: f64,
    pub temperature_critical: f64,
    pub oil_temperature_warning: f64,
    pub oil_temperature_critical: f64,
    pub vibration_warning: f64,
    pub vibration_critical: f64,
    pub gas_c2h2_warning: f64,
    pub gas_c2h2_critical: f64,
    pub gas_h2_warning: f64,
    pub gas_h2_critical: f64,
    pub gas_ch4_warning: f64,
    pub gas_ch4_critical: f64,
    /// Any phase below this flags `voltage_risk`
    pub voltage_min: f64,
    /// Any phase above this flags `voltage_risk`
    pub voltage_max: f64,
}

impl Default for DomainThresholds {
    fn default() -> Self {
        Self {
            temperature_warning: 85.0,
            temperature_critical: 100.0,
            oil_temperature_warning: 75.0,
            oil_temperature_critical: 90.0,
            vibration_warning: 5.0,
            vibration_critical: 8.0,
            gas_c2h2_warning: 50.0,
            gas_c2h2_critical: 100.0,
            gas_h2_warning: 150.0,
            gas_h2_critical: 300.0,
            gas_ch4_warning: 100.0,
            gas_ch4_critical: 200.0,
            voltage_min: 220.0,
            voltage_max: 240.0,
        }
    }
}

impl DomainThresholds {
    fn escalations(&self) -> [(&'static str, f64, f64); 6] {
        [
            ("temperature", self.temperature_warning, self.temperature_critical),
            ("oil_temperature", self.oil_temperature_warning, self.oil_temperature_critical),
            ("vibration", self.vibration_warning, self.vibration_critical),
            ("gas_c2h2", self.gas_c2h2_warning, self.gas_c2h2_critical),
            ("gas_h2", self.gas_h2_warning, self.gas_h2_critical),
            ("gas_ch4", self.gas_ch4_warning, self.gas_ch4_critical),
        ]
    }
}

// ============================================================================
// Output
// ============================================================================

/// Artifact locations, relative to `data_dir` unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub data_dir: PathBuf,
    pub raw_telemetry: PathBuf,
    pub locations: PathBuf,
    pub cleaned: PathBuf,
    pub features: PathBuf,
    pub dashboard_sample: PathBuf,
    /// Rows in the stratified dashboard subsample (0 disables it)
    pub dashboard_sample_rows: usize,
    /// zstd level for the telemetry artifact
    pub compression_level: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            raw_telemetry: PathBuf::from("raw/grid_telemetry.ggt"),
            locations: PathBuf::from("raw/equipment_locations.csv"),
            cleaned: PathBuf::from("processed/cleaned_data.csv"),
            features: PathBuf::from("processed/features.csv"),
            dashboard_sample: PathBuf::from("processed/dashboard_sample.csv"),
            dashboard_sample_rows: defaults::DASHBOARD_SAMPLE_ROWS,
            compression_level: defaults::COMPRESSION_LEVEL,
        }
    }
}

impl OutputConfig {
    /// Resolve an artifact path against `data_dir`.
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.data_dir.join(relative)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = GuardianConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: GuardianConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config, GuardianConfig::default());
        assert_eq!(config.thresholds.critical.gas_c2h2, 100.0);
        assert_eq!(config.score_weights.gas_c2h2.weight, 0.25);
        assert_eq!(config.features.rolling_windows, vec![3, 6, 12, 24]);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[generation]
n_substations = 2
seed = 7

[thresholds.critical]
gas_c2h2 = 120.0

[features]
lag_channels = ["gas_h2", "temperature_oil"]
"#;
        let config: GuardianConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.generation.n_substations, 2);
        assert_eq!(config.generation.seed, 7);
        assert_eq!(config.thresholds.critical.gas_c2h2, 120.0);
        // Siblings keep their defaults
        assert_eq!(config.generation.equipment_per_substation, 10);
        assert_eq!(config.thresholds.critical.gas_h2, 300.0);
        assert_eq!(config.thresholds.warning.gas_c2h2, 50.0);
        assert_eq!(
            config.features.lag_channels,
            vec![SensorChannel::GasH2, SensorChannel::TemperatureOil]
        );
    }

    #[test]
    fn test_zero_hours_rejected() {
        let mut config = GuardianConfig::default();
        config.generation.hours = 0;
        config.generation.n_substations = 0;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 2, "{errors:?}");
                assert!(errors.iter().any(|e| e.contains("hours")));
                assert!(errors.iter().any(|e| e.contains("n_substations")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = GuardianConfig::default();
        config.thresholds.warning.gas_h2 = 400.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("thresholds.gas_h2"));
    }

    #[test]
    fn test_empty_window_list_rejected() {
        let mut config = GuardianConfig::default();
        config.features.rolling_windows.clear();
        config.features.statistics_channels.clear();
        let err = config.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("rolling_windows"));
        assert!(msg.contains("statistics_channels"));
    }

    #[test]
    fn test_score_weights_must_sum_to_one() {
        let mut config = GuardianConfig::default();
        config.score_weights.gas_c2h2.weight = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = GuardianConfig::default();
        let text = config.to_toml().unwrap();
        let back = GuardianConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let out = OutputConfig::default();
        assert_eq!(
            out.resolve(Path::new("raw/x.ggt")),
            PathBuf::from("data").join("raw/x.ggt")
        );
        assert_eq!(out.resolve(Path::new("/tmp/x.csv")), PathBuf::from("/tmp/x.csv"));
    }
}
