//! Telemetry Batch Generator
//!
//! Orchestrates the degradation model and the sensor synthesizer across the
//! fleet:
//!
//! 1. One degradation pattern per unit, drawn up front (parallel over units)
//! 2. Time processed in fixed-size batches (default 168 h) to bound memory
//! 3. Per batch, each unit's severity slice is synthesized (parallel over
//!    units) and appended equipment-major to the batch table
//! 4. Each batch goes to a [`BatchSink`]; the first batch fixes the schema
//!
//! Every unit and batch draws from its own RNG stream, so the parallel run is
//! bit-identical to a sequential one.

mod locations;

pub use locations::{generate_locations, EquipmentLocation, EquipmentType};

use chrono::{NaiveDateTime, TimeDelta};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::config::GenerationConfig;
use crate::degradation::{DegradationError, DegradationModel, DegradationPattern};
use crate::seed::{RunSeed, Stream};
use crate::storage::{ArtifactManifest, BatchSink, ColumnarWriter, MemorySink, StorageError};
use crate::synthesis::{ChannelReadings, SensorSynthesizer, SynthesisError};
use crate::types::{EquipmentId, TableError, TelemetryTable};

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("invalid generation parameters: {0}")]
    Config(String),
    #[error(transparent)]
    Degradation(#[from] DegradationError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Canonical ids, substation-major: `SUB001_EQ01`, `SUB001_EQ02`, ...
pub fn equipment_ids(n_substations: usize, equipment_per_substation: usize) -> Vec<EquipmentId> {
    (1..=n_substations)
        .flat_map(|sub| (1..=equipment_per_substation).map(move |eq| EquipmentId::new(sub, eq)))
        .collect()
}

/// Observational output of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub equipment: usize,
    pub failing_equipment: usize,
    pub hours: usize,
    pub batches: usize,
    pub rows: usize,
}

pub struct TelemetryGenerator {
    hours: usize,
    batch_size_hours: usize,
    start_time: NaiveDateTime,
    seed: RunSeed,
    model: DegradationModel,
    synthesizer: SensorSynthesizer,
}

impl TelemetryGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, GeneratorError> {
        if config.hours == 0 {
            return Err(GeneratorError::Config("hours must be > 0".to_string()));
        }
        if config.batch_size_hours == 0 {
            return Err(GeneratorError::Config(
                "batch_size_hours must be > 0".to_string(),
            ));
        }
        Ok(Self {
            hours: config.hours,
            batch_size_hours: config.batch_size_hours,
            start_time: config.start_time,
            seed: RunSeed::new(config.seed),
            model: DegradationModel::from_config(config)?,
            synthesizer: SensorSynthesizer::new()?,
        })
    }

    pub const fn hours(&self) -> usize {
        self.hours
    }

    pub const fn batch_count(&self) -> usize {
        self.hours.div_ceil(self.batch_size_hours)
    }

    /// One pattern per unit, in `ids` order. Unit `i` always uses stream `i`.
    pub fn degradation_patterns(
        &self,
        ids: &[EquipmentId],
    ) -> Result<Vec<DegradationPattern>, GeneratorError> {
        let patterns = (0..ids.len())
            .into_par_iter()
            .map(|i| {
                let mut rng = self.seed.rng(Stream::Degradation, i as u64, 0);
                self.model.generate_pattern(self.hours, &mut rng)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let failing = patterns.iter().filter(|p| p.is_failing()).count();
        info!(
            equipment = ids.len(),
            failing,
            failing_pct = if ids.is_empty() { 0.0 } else { failing as f64 / ids.len() as f64 * 100.0 },
            "Degradation patterns drawn"
        );
        Ok(patterns)
    }

    /// Synthesize hours `[start_hour, start_hour + batch_size)` for every unit.
    pub fn generate_batch(
        &self,
        ids: &[EquipmentId],
        patterns: &[DegradationPattern],
        batch_index: usize,
    ) -> Result<TelemetryTable, GeneratorError> {
        if ids.len() != patterns.len() {
            return Err(GeneratorError::Config(format!(
                "{} equipment ids but {} degradation patterns",
                ids.len(),
                patterns.len()
            )));
        }
        let start_hour = batch_index * self.batch_size_hours;
        let batch_hours = self.batch_size_hours.min(self.hours.saturating_sub(start_hour));

        let timestamps: Vec<NaiveDateTime> = (start_hour..start_hour + batch_hours)
            .map(|h| self.timestamp(h))
            .collect::<Result<_, _>>()?;

        let readings: Vec<ChannelReadings> = patterns
            .par_iter()
            .enumerate()
            .map(|(i, pattern)| {
                let mut rng = self.seed.rng(Stream::Synthesis, i as u64, batch_index as u64);
                let severity = pattern.window(start_hour, batch_hours);
                self.synthesizer
                    .generate_readings(batch_hours, start_hour, severity, &mut rng)
            })
            .collect::<Result<_, _>>()?;

        let mut table = TelemetryTable::with_capacity(ids.len() * batch_hours);
        for (id, r) in ids.iter().zip(readings) {
            table.append_series(id, &timestamps, r.columns())?;
        }
        Ok(table)
    }

    fn timestamp(&self, hour: usize) -> Result<NaiveDateTime, GeneratorError> {
        i64::try_from(hour)
            .ok()
            .and_then(TimeDelta::try_hours)
            .and_then(|d| self.start_time.checked_add_signed(d))
            .ok_or_else(|| GeneratorError::Config(format!("hour {hour} overflows the calendar")))
    }

    /// Run the whole fleet into `sink`.
    pub fn generate<S: BatchSink + ?Sized>(
        &self,
        ids: &[EquipmentId],
        sink: &mut S,
    ) -> Result<GenerationSummary, GeneratorError> {
        if ids.is_empty() {
            return Err(GeneratorError::Config("no equipment units".to_string()));
        }
        let patterns = self.degradation_patterns(ids)?;

        let batches = self.batch_count();
        let mut rows = 0;
        for batch_index in 0..batches {
            let batch = self.generate_batch(ids, &patterns, batch_index)?;
            rows += batch.len();
            sink.write_batch(&batch)?;
            debug!(
                batch = batch_index + 1,
                of = batches,
                rows = batch.len(),
                sink = sink.sink_name(),
                "Batch written"
            );
        }

        let summary = GenerationSummary {
            equipment: ids.len(),
            failing_equipment: patterns.iter().filter(|p| p.is_failing()).count(),
            hours: self.hours,
            batches,
            rows,
        };
        info!(rows, batches, equipment = ids.len(), "Telemetry generation complete");
        Ok(summary)
    }

    /// Generate into memory.
    pub fn generate_table(
        &self,
        ids: &[EquipmentId],
    ) -> Result<(TelemetryTable, GenerationSummary), GeneratorError> {
        let mut sink = MemorySink::new();
        let summary = self.generate(ids, &mut sink)?;
        Ok((sink.into_table(), summary))
    }

    /// Generate into a committed columnar artifact.
    ///
    /// On any error the writer is dropped and the partial file removed.
    pub fn generate_to_path(
        &self,
        ids: &[EquipmentId],
        path: &Path,
        compression_level: i32,
    ) -> Result<(GenerationSummary, ArtifactManifest), GeneratorError> {
        let mut writer = ColumnarWriter::create(path, compression_level)?;
        let summary = self.generate(ids, &mut writer)?;
        let manifest = writer.finish()?;
        Ok((summary, manifest))
    }
}
