//! Pipeline Runner
//!
//! Strictly sequential batch stages:
//!
//! ```text
//! GENERATE:   fleet ids → degradation patterns → batched synthesis → .ggt artifact
//!             (+ location reference table)
//! PREPROCESS: artifact → fill / cap / dedupe / clamp → cleaned table
//! LABEL:      cleaned table → failure_probability, risk_level, failure
//! FEATURES:   labeled table (labeled here if needed) → feature frame → optional balancing
//!             → feature table (+ stratified, aliased dashboard sample)
//! ```
//!
//! The first failing stage halts the run; its name travels with the error.

use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info};

use crate::config::{ConfigError, GuardianConfig};
use crate::features::{FeatureEngineer, FeatureError, FeatureOutcome};
use crate::generator::{
    equipment_ids, generate_locations, GenerationSummary, GeneratorError, TelemetryGenerator,
};
use crate::labeling::{LabelOutcome, RiskLabeler};
use crate::preprocessing::{BalanceSummary, DataQualityReport, PreprocessOutcome, Preprocessor};
use crate::sampling::{stratified_sample, with_dashboard_aliases};
use crate::seed::RunSeed;
use crate::storage::columnar::read_telemetry;
use crate::storage::tables::{write_frame_csv, write_locations_csv, write_telemetry_csv};
use crate::storage::{ArtifactManifest, StorageError};
use crate::types::{RiskDistribution, TableError, TelemetryTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Generate,
    Preprocess,
    Label,
    Features,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Generate => "generate",
            PipelineStage::Preprocess => "preprocess",
            PipelineStage::Label => "label",
            PipelineStage::Features => "features",
        };
        f.write_str(name)
    }
}

/// Underlying cause of a stage failure.
#[derive(Debug, thiserror::Error)]
pub enum StageFailure {
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Features(#[from] FeatureError),
    #[error(transparent)]
    Table(#[from] TableError),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),
    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: StageFailure,
    },
}

impl PipelineError {
    /// The stage that failed, if the error came from a stage.
    pub const fn stage(&self) -> Option<PipelineStage> {
        match self {
            PipelineError::Config(_) => None,
            PipelineError::Stage { stage, .. } => Some(*stage),
        }
    }
}

/// Tag a stage result with its stage name, logging the failure.
fn in_stage<T, E: Into<StageFailure>>(
    stage: PipelineStage,
    result: Result<T, E>,
) -> Result<T, PipelineError> {
    result.map_err(|e| {
        let source = e.into();
        error!(stage = %stage, error = %source, "Stage failed");
        PipelineError::Stage { stage, source }
    })
}

/// Output of the generate stage.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOutput {
    pub summary: GenerationSummary,
    pub manifest: ArtifactManifest,
    pub locations: PathBuf,
}

/// Output of the features stage.
#[derive(Debug, Clone)]
pub struct FeaturesOutput {
    pub features: FeatureOutcome,
    pub balance: BalanceSummary,
    pub features_path: PathBuf,
    /// Rows written to the dashboard sample, if one was written
    pub dashboard_rows: Option<usize>,
}

/// What a full run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub generation: GenerationSummary,
    pub artifact: ArtifactManifest,
    pub cleaned_rows: usize,
    pub distribution: RiskDistribution,
    pub fallback_used: bool,
    pub feature_columns: usize,
    pub balance: BalanceSummary,
    pub dashboard_rows: Option<usize>,
    pub quality: DataQualityReport,
}

pub struct PipelineRunner {
    config: GuardianConfig,
}

impl PipelineRunner {
    /// Validate `config` and build a runner around it.
    pub fn new(config: GuardianConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GuardianConfig {
        &self.config
    }

    /// Generate the raw telemetry artifact and the location table.
    pub fn generate(&self) -> Result<GenerateOutput, PipelineError> {
        let stage = PipelineStage::Generate;
        let gen = &self.config.generation;
        let output = &self.config.output;
        info!(
            stage = %stage,
            equipment = gen.equipment_count(),
            hours = gen.hours,
            rows = gen.total_rows(),
            "Stage started"
        );

        let ids = equipment_ids(gen.n_substations, gen.equipment_per_substation);
        let generator = in_stage(stage, TelemetryGenerator::new(gen))?;
        let raw_path = output.resolve(&output.raw_telemetry);
        let (summary, manifest) = in_stage(
            stage,
            generator.generate_to_path(&ids, &raw_path, output.compression_level),
        )?;

        let locations_path = output.resolve(&output.locations);
        let locations = generate_locations(
            gen.n_substations,
            gen.equipment_per_substation,
            RunSeed::new(gen.seed),
        );
        in_stage(stage, write_locations_csv(&locations_path, &locations))?;

        info!(
            path = %raw_path.display(),
            rows = manifest.rows,
            bytes = manifest.bytes,
            locations = locations.len(),
            "Raw telemetry written"
        );
        Ok(GenerateOutput {
            summary,
            manifest,
            locations: locations_path,
        })
    }

    /// Clean `raw` and write the cleaned table.
    pub fn preprocess(&self, raw: TelemetryTable) -> Result<PreprocessOutcome, PipelineError> {
        let stage = PipelineStage::Preprocess;
        info!(stage = %stage, rows = raw.len(), "Stage started");

        let outcome = Preprocessor::new(&self.config.preprocessing).clean(raw);
        let path = self.config.output.resolve(&self.config.output.cleaned);
        in_stage(stage, write_telemetry_csv(&path, &outcome.table))?;
        info!(path = %path.display(), rows = outcome.table.len(), "Cleaned table written");
        Ok(outcome)
    }

    /// Attach risk labels.
    pub fn label(&self, cleaned: TelemetryTable) -> Result<LabelOutcome, PipelineError> {
        let stage = PipelineStage::Label;
        info!(stage = %stage, rows = cleaned.len(), "Stage started");
        in_stage(stage, RiskLabeler::new(&self.config).label(cleaned))
    }

    /// Engineer features, balance classes and write the feature table and
    /// the dashboard sample.
    ///
    /// A table without labels (already cleaned, never labeled) is labeled
    /// first, so the feature table always carries the `failure` target.
    pub fn features(&self, table: &TelemetryTable) -> Result<FeaturesOutput, PipelineError> {
        let (labeled, label_report) = if table.is_labeled() {
            (Cow::Borrowed(table), None)
        } else {
            info!(rows = table.len(), "No labels on input, labeling before feature engineering");
            let outcome = self.label(table.clone())?;
            (Cow::Owned(outcome.table), Some(outcome.report))
        };

        let stage = PipelineStage::Features;
        info!(stage = %stage, rows = labeled.len(), "Stage started");

        let engineer = in_stage(stage, FeatureEngineer::new(&self.config.features))?;
        let mut features = in_stage(stage, engineer.engineer(&labeled))?;
        if let Some(report) = label_report {
            features.report.merge(report);
        }

        let seed = RunSeed::new(self.config.generation.seed);
        let (frame, balance) = in_stage(
            stage,
            Preprocessor::new(&self.config.preprocessing).balance(
                features.frame,
                seed,
                &mut features.report,
            ),
        )?;
        features.frame = frame;

        let output = &self.config.output;
        let features_path = output.resolve(&output.features);
        in_stage(stage, write_frame_csv(&features_path, &features.frame))?;
        info!(
            path = %features_path.display(),
            rows = features.frame.len(),
            columns = features.frame.width(),
            "Feature table written"
        );

        let dashboard_rows = if output.dashboard_sample_rows == 0 {
            None
        } else {
            let sample = in_stage(
                stage,
                stratified_sample(&features.frame, output.dashboard_sample_rows, seed)
                    .and_then(with_dashboard_aliases),
            )?;
            let path = output.resolve(&output.dashboard_sample);
            in_stage(stage, write_frame_csv(&path, &sample))?;
            info!(path = %path.display(), rows = sample.len(), "Dashboard sample written");
            Some(sample.len())
        };

        Ok(FeaturesOutput {
            features,
            balance,
            features_path,
            dashboard_rows,
        })
    }

    /// Every stage, in order. The first failure halts the run.
    pub fn run(&self) -> Result<PipelineReport, PipelineError> {
        let generated = self.generate()?;
        let raw = in_stage(PipelineStage::Preprocess, read_telemetry(&generated.manifest.path))?;

        let cleaned = self.preprocess(raw)?;
        let mut quality = cleaned.report;
        let cleaned_rows = cleaned.table.len();

        let labeled = self.label(cleaned.table)?;
        quality.merge(labeled.report);

        let features = self.features(&labeled.table)?;
        quality.merge(features.features.report);

        let report = PipelineReport {
            generation: generated.summary,
            artifact: generated.manifest,
            cleaned_rows,
            distribution: labeled.distribution,
            fallback_used: labeled.fallback_used,
            feature_columns: features.features.summary.columns,
            balance: features.balance,
            dashboard_rows: features.dashboard_rows,
            quality,
        };
        info!(
            rows = report.generation.rows,
            feature_columns = report.feature_columns,
            warnings = report.quality.len(),
            "Pipeline complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputConfig;
    use tempfile::tempdir;

    fn small_config(dir: &std::path::Path) -> GuardianConfig {
        let mut config = GuardianConfig::default();
        config.generation.n_substations = 1;
        config.generation.equipment_per_substation = 2;
        config.generation.hours = 48;
        config.generation.batch_size_hours = 24;
        config.output = OutputConfig {
            data_dir: dir.to_path_buf(),
            dashboard_sample_rows: 20,
            ..OutputConfig::default()
        };
        config
    }

    #[test]
    fn test_invalid_config_rejected_before_any_stage() {
        let mut config = GuardianConfig::default();
        config.generation.hours = 0;
        let err = PipelineRunner::new(config).err().unwrap();
        assert!(matches!(err, PipelineError::Config(_)));
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_full_run_writes_every_artifact() {
        let dir = tempdir().unwrap();
        let config = small_config(dir.path());
        let report = PipelineRunner::new(config.clone()).unwrap().run().unwrap();

        assert_eq!(report.generation.rows, 96);
        assert_eq!(report.artifact.rows, 96);
        assert_eq!(report.distribution.total(), report.cleaned_rows);
        let sampled = report.dashboard_rows.unwrap();
        assert!(sampled > 0 && sampled <= 23, "sampled {sampled}");
        for file in [
            &config.output.raw_telemetry,
            &config.output.locations,
            &config.output.cleaned,
            &config.output.features,
            &config.output.dashboard_sample,
        ] {
            assert!(config.output.resolve(file).exists(), "{}", file.display());
        }
    }

    #[test]
    fn test_failing_stage_is_named() {
        let dir = tempdir().unwrap();
        let mut config = small_config(dir.path());
        // A directory where the cleaned table should go makes the write fail
        let cleaned = config.output.resolve(&config.output.cleaned);
        std::fs::create_dir_all(&cleaned).unwrap();
        config.output.dashboard_sample_rows = 0;

        let err = PipelineRunner::new(config).unwrap().run().unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Preprocess));
        assert!(err.to_string().contains("preprocess"));
    }

    #[test]
    fn test_features_label_an_unlabeled_table() {
        let dir = tempdir().unwrap();
        let runner = PipelineRunner::new(small_config(dir.path())).unwrap();
        let ids = equipment_ids(1, 2);
        let (raw, _) = TelemetryGenerator::new(&runner.config().generation)
            .unwrap()
            .generate_table(&ids)
            .unwrap();
        let cleaned = runner.preprocess(raw).unwrap().table;
        assert!(!cleaned.is_labeled());

        let output = runner.features(&cleaned).unwrap();
        let frame = &output.features.frame;
        assert_eq!(frame.len(), 96);
        assert!(frame.has_column(crate::types::label_columns::FAILURE));
        assert!(frame.has_column(crate::types::label_columns::RISK_LEVEL));
        assert_eq!(output.balance.rows_after, 96);
        assert!(output.dashboard_rows.is_some());
    }

    #[test]
    fn test_sample_follows_configured_seed() {
        let dir = tempdir().unwrap();
        let base = small_config(dir.path());
        let (table, _) = TelemetryGenerator::new(&base.generation)
            .unwrap()
            .generate_table(&equipment_ids(1, 2))
            .unwrap();

        let sample_keys = |seed: u64| {
            let mut config = base.clone();
            config.generation.seed = seed;
            let runner = PipelineRunner::new(config.clone()).unwrap();
            runner.features(&table).unwrap();
            let sample = crate::storage::tables::read_frame_csv(
                &config.output.resolve(&config.output.dashboard_sample),
            )
            .unwrap();
            (sample.equipment_ids().to_vec(), sample.timestamps().to_vec())
        };
        assert_eq!(sample_keys(1), sample_keys(1));
        assert_ne!(sample_keys(1), sample_keys(2));
    }
}
