//! Artifact storage
//!
//! - `columnar`: zstd-compressed, column-oriented telemetry artifact written
//!   batch by batch with a fixed schema and a rename-on-success commit
//! - `tables`: delimited tables (cleaned, labeled, feature and location tables)
//!
//! Batch producers write through the [`BatchSink`] trait so the generator does
//! not care whether batches land on disk or in memory.

pub mod columnar;
pub mod tables;

pub use columnar::{ArtifactManifest, ColumnKind, ColumnSchema, ColumnarReader, ColumnarWriter};

use std::path::{Path, PathBuf};

use crate::types::{TableError, TelemetryTable};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("delimited table error: {0}")]
    Csv(#[from] csv::Error),
    #[error(
        "schema drift in batch {batch}: expected [{}], found [{}]",
        expected.join(", "),
        found.join(", ")
    )]
    SchemaDrift {
        batch: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("required column '{0}' is missing")]
    MissingColumn(String),
    #[error("{}: not a telemetry artifact (bad magic)", .0.display())]
    BadMagic(PathBuf),
    #[error("{}: incomplete artifact: {reason}", path.display())]
    Incomplete { path: PathBuf, reason: String },
    #[error("row {row}, column '{column}': cannot parse '{value}'")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },
    #[error(transparent)]
    Table(#[from] TableError),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Destination for generated telemetry batches.
pub trait BatchSink {
    /// Append one batch. The first batch fixes the schema.
    fn write_batch(&mut self, batch: &TelemetryTable) -> Result<(), StorageError>;

    /// Sink name for logging
    fn sink_name(&self) -> &'static str;
}

/// Collects batches into one in-memory table.
#[derive(Debug, Default)]
pub struct MemorySink {
    table: TelemetryTable,
    batches: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn batches(&self) -> usize {
        self.batches
    }

    pub fn into_table(self) -> TelemetryTable {
        self.table
    }
}

impl BatchSink for MemorySink {
    fn write_batch(&mut self, batch: &TelemetryTable) -> Result<(), StorageError> {
        self.table.extend_from(batch)?;
        self.batches += 1;
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "memory"
    }
}

/// Create the parent directory of `path` if needed.
pub(crate) fn ensure_parent(path: &Path) -> Result<(), StorageError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))
        }
        _ => Ok(()),
    }
}
