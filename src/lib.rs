//! Grid Guardian: power-grid predictive-maintenance data core
//!
//! Synthesizes fleet telemetry for transformers, labels failure risk and
//! derives model-ready features.
//!
//! ## Architecture
//!
//! - **Degradation Model**: per-unit severity trajectories with random onset
//! - **Sensor Synthesizer**: 16 physically bounded channels from severity and load
//! - **Telemetry Generator**: fixed-size time batches streamed to a columnar artifact
//! - **Preprocessor**: fill, cap, dedupe and clamp; class balancing
//! - **Risk Labeler**: weighted failure probability plus rule levels
//! - **Feature Engineer**: ordered, per-unit feature stages
//! - **Pipeline**: generate → preprocess → label → features

pub mod config;
pub mod degradation;
pub mod features;
pub mod generator;
pub mod labeling;
pub mod pipeline;
pub mod preprocessing;
pub mod sampling;
pub mod seed;
pub(crate) mod stats;
pub mod storage;
pub mod synthesis;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, GuardianConfig};

// Re-export commonly used types
pub use types::{
    EquipmentId, FeatureColumn, FeatureFrame, RiskDistribution, RiskLevel, SensorChannel,
    TableError, TelemetryRecord, TelemetryTable,
};

// Re-export stage entry points
pub use features::{FeatureEngineer, FeatureError, FeatureOutcome};
pub use generator::{GenerationSummary, GeneratorError, TelemetryGenerator};
pub use labeling::{LabelOutcome, RiskLabeler};
pub use pipeline::{PipelineError, PipelineReport, PipelineRunner, PipelineStage};
pub use preprocessing::{DataQualityReport, DataQualityWarning, Preprocessor};
pub use seed::RunSeed;
pub use storage::StorageError;
