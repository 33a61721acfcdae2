//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery. Threshold and weight defaults live
//! next to their structs in guardian_config.rs.

// ============================================================================
// Generation
// ============================================================================

pub const N_SUBSTATIONS: usize = 5;

pub const EQUIPMENT_PER_SUBSTATION: usize = 10;

/// Run length in hours. 2 160 = 90 days.
pub const HOURS: usize = 2_160;

/// Hours per synthesized batch. 168 = one week.
pub const BATCH_SIZE_HOURS: usize = 168;

/// Probability that a unit degrades and fails during the run.
pub const DEGRADATION_PROBABILITY: f64 = 0.05;

/// Degradation ramp length bounds (hours), `[min, max)`.
pub const ONSET_MIN_HOURS: usize = 168;
pub const ONSET_MAX_HOURS: usize = 720;

/// Earliest failure hour as a fraction of the run length.
pub const FAILURE_WINDOW_START: f64 = 0.2;

pub const SEED: u64 = 42;

// ============================================================================
// Sensor Synthesis
// ============================================================================

/// Mean relative load over a day.
pub const LOAD_BASE: f64 = 0.6;

/// Amplitude of the daily load sinusoid.
pub const LOAD_AMPLITUDE: f64 = 0.3;

/// Hour of day at which the load sinusoid crosses its mean going up.
pub const LOAD_PHASE_HOUR: f64 = 6.0;

pub const LOAD_NOISE_STD: f64 = 0.05;

/// Load clip range (fraction of rated capacity).
pub const LOAD_MIN: f64 = 0.3;
pub const LOAD_MAX: f64 = 1.0;

// ============================================================================
// Location Reference Table
// ============================================================================

/// South-west corner of the substation grid (degrees).
pub const GRID_ORIGIN_LAT: f64 = 40.0;
pub const GRID_ORIGIN_LON: f64 = -75.0;

/// Grid extent (degrees).
pub const GRID_SPAN_LAT: f64 = 2.0;
pub const GRID_SPAN_LON: f64 = 3.0;

/// Uniform jitter half-widths (degrees).
pub const SUBSTATION_JITTER_DEG: f64 = 0.05;
pub const EQUIPMENT_JITTER_DEG: f64 = 0.001;

/// Installation years are drawn from `[min, max)`.
pub const INSTALL_YEAR_MIN: i32 = 1990;
pub const INSTALL_YEAR_MAX: i32 = 2023;

// ============================================================================
// Features
// ============================================================================

/// Above this many distinct units one-hot encoding is skipped.
pub const MAX_ONE_HOT_CARDINALITY: usize = 200;

/// Guard added to denominators of ratio features.
pub const RATIO_EPSILON: f64 = 1.0;

// ============================================================================
// Output
// ============================================================================

/// zstd level for the telemetry artifact.
pub const COMPRESSION_LEVEL: i32 = 3;

/// Rows in the stratified dashboard subsample.
pub const DASHBOARD_SAMPLE_ROWS: usize = 10_000;
