//! Columnar telemetry artifact (`.ggt`)
//!
//! Layout:
//!
//! ```text
//! "GGT1"
//! frame*          frame = kind:u8 | len:u64 LE | payload
//! ```
//!
//! Frame kinds: schema (JSON, always first), batch (zstd-compressed JSON, one
//! array per column), footer (JSON row and batch counts, always last).
//!
//! Writes go to `<path>.partial`. [`ColumnarWriter::finish`] appends the
//! footer, syncs, renames to the final path and writes a
//! `<path>.manifest.json` sidecar. A writer dropped before `finish` deletes
//! its partial file, so an interrupted run never leaves something that looks
//! complete.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{ensure_parent, BatchSink, StorageError};
use crate::types::{label_columns, EquipmentId, RiskColumns, RiskLevel, SensorChannel, TelemetryTable};

const MAGIC: &[u8; 4] = b"GGT1";

const FRAME_SCHEMA: u8 = 1;
const FRAME_BATCH: u8 = 2;
const FRAME_FOOTER: u8 = 3;

const TIMESTAMP_COLUMN: &str = "timestamp";
const EQUIPMENT_COLUMN: &str = "equipment_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Seconds since the Unix epoch, UTC-naive
    Timestamp,
    Text,
    Float,
    /// Small unsigned integers (labels)
    Integer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSchema {
    fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

/// Schema implied by a telemetry table.
pub fn schema_of(table: &TelemetryTable) -> Vec<ColumnSchema> {
    let mut schema = vec![
        ColumnSchema::new(TIMESTAMP_COLUMN, ColumnKind::Timestamp),
        ColumnSchema::new(EQUIPMENT_COLUMN, ColumnKind::Text),
    ];
    schema.extend(
        SensorChannel::ALL
            .iter()
            .map(|ch| ColumnSchema::new(ch.name(), ColumnKind::Float)),
    );
    if table.is_labeled() {
        schema.push(ColumnSchema::new(label_columns::FAILURE, ColumnKind::Integer));
        schema.push(ColumnSchema::new(label_columns::RISK_LEVEL, ColumnKind::Integer));
        schema.push(ColumnSchema::new(
            label_columns::FAILURE_PROBABILITY,
            ColumnKind::Float,
        ));
    }
    schema
}

fn column_names(schema: &[ColumnSchema]) -> Vec<String> {
    schema.iter().map(|c| format!("{}:{:?}", c.name, c.kind)).collect()
}

/// One column of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
enum ColumnData {
    Timestamp(Vec<i64>),
    Text(Vec<String>),
    /// `NaN` is stored as `null`
    Float(Vec<Option<f64>>),
    Integer(Vec<u8>),
}

impl ColumnData {
    fn len(&self) -> usize {
        match self {
            ColumnData::Timestamp(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Integer(v) => v.len(),
        }
    }

    fn floats(values: &[f64]) -> Self {
        ColumnData::Float(
            values
                .iter()
                .map(|&v| if v.is_nan() { None } else { Some(v) })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BatchFrame {
    rows: usize,
    columns: Vec<ColumnData>,
}

impl BatchFrame {
    fn encode(table: &TelemetryTable) -> Self {
        let mut columns = vec![
            ColumnData::Timestamp(
                table
                    .timestamps()
                    .iter()
                    .map(|t| t.and_utc().timestamp())
                    .collect(),
            ),
            ColumnData::Text(
                table
                    .equipment_ids()
                    .iter()
                    .map(|id| id.as_str().to_string())
                    .collect(),
            ),
        ];
        columns.extend(
            SensorChannel::ALL
                .iter()
                .map(|&ch| ColumnData::floats(table.channel(ch))),
        );
        if let Some(labels) = table.labels() {
            columns.push(ColumnData::Integer(labels.failure.clone()));
            columns.push(ColumnData::Integer(
                labels.risk_level.iter().map(|l| l.as_u8()).collect(),
            ));
            columns.push(ColumnData::floats(&labels.failure_probability));
        }
        Self {
            rows: table.len(),
            columns,
        }
    }

    fn decode(self, schema: &[ColumnSchema], path: &Path) -> Result<TelemetryTable, StorageError> {
        let corrupt = |reason: String| StorageError::Incomplete {
            path: path.to_path_buf(),
            reason,
        };
        if self.columns.len() != schema.len() {
            return Err(corrupt(format!(
                "batch has {} columns, schema declares {}",
                self.columns.len(),
                schema.len()
            )));
        }
        if let Some(bad) = self.columns.iter().position(|c| c.len() != self.rows) {
            return Err(corrupt(format!(
                "column '{}' has {} values, batch declares {} rows",
                schema[bad].name,
                self.columns[bad].len(),
                self.rows
            )));
        }

        let mut timestamps = Vec::new();
        let mut ids = Vec::new();
        let mut channels: Vec<Option<Vec<f64>>> = vec![None; SensorChannel::COUNT];
        let mut failure_probability = None;
        let mut risk_level = None;

        for (spec, data) in schema.iter().zip(self.columns) {
            match (spec.name.as_str(), data) {
                (TIMESTAMP_COLUMN, ColumnData::Timestamp(v)) => {
                    timestamps = v
                        .into_iter()
                        .map(|s| {
                            DateTime::<Utc>::from_timestamp(s, 0)
                                .map(|dt| dt.naive_utc())
                                .ok_or_else(|| corrupt(format!("timestamp {s} out of range")))
                        })
                        .collect::<Result<Vec<NaiveDateTime>, _>>()?;
                }
                (EQUIPMENT_COLUMN, ColumnData::Text(v)) => {
                    ids = v.into_iter().map(EquipmentId::from_raw).collect();
                }
                (label_columns::FAILURE, ColumnData::Integer(_)) => {
                    // Derived from risk_level on load
                }
                (label_columns::RISK_LEVEL, ColumnData::Integer(v)) => {
                    risk_level = Some(
                        v.into_iter()
                            .map(|l| {
                                RiskLevel::from_u8(l)
                                    .ok_or_else(|| corrupt(format!("risk level {l} out of range")))
                            })
                            .collect::<Result<Vec<_>, _>>()?,
                    );
                }
                (label_columns::FAILURE_PROBABILITY, ColumnData::Float(v)) => {
                    failure_probability =
                        Some(v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect::<Vec<_>>());
                }
                (name, ColumnData::Float(v)) => {
                    let channel: SensorChannel = name
                        .parse()
                        .map_err(|_| corrupt(format!("unexpected column '{name}'")))?;
                    channels[channel.index()] =
                        Some(v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect());
                }
                (name, _) => return Err(corrupt(format!("column '{name}' has the wrong kind"))),
            }
        }

        let channels = channels
            .into_iter()
            .zip(SensorChannel::ALL)
            .map(|(c, ch)| c.ok_or_else(|| StorageError::MissingColumn(ch.name().to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        let labels = match (failure_probability, risk_level) {
            (Some(probs), Some(levels)) => {
                let mut cols = RiskColumns::with_capacity(levels.len());
                for (p, l) in probs.into_iter().zip(levels) {
                    cols.push(p, l);
                }
                Some(cols)
            }
            _ => None,
        };

        Ok(TelemetryTable::from_columns(timestamps, ids, channels, labels)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Footer {
    rows: usize,
    batches: usize,
}

/// Sidecar written next to a committed artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub path: PathBuf,
    pub rows: usize,
    pub batches: usize,
    pub bytes: u64,
    pub columns: Vec<ColumnSchema>,
    pub completed_at: DateTime<Utc>,
}

impl ArtifactManifest {
    pub fn sidecar_path(artifact: &Path) -> PathBuf {
        let mut name = artifact.as_os_str().to_owned();
        name.push(".manifest.json");
        PathBuf::from(name)
    }

    pub fn load(artifact: &Path) -> Result<Self, StorageError> {
        let path = Self::sidecar_path(artifact);
        let text = fs::read_to_string(&path).map_err(|e| StorageError::io(&path, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

// ============================================================================
// Writer
// ============================================================================

/// Single-writer, batch-at-a-time artifact writer.
///
/// Scoped resource: either [`finish`](Self::finish) commits the artifact or
/// dropping the writer removes the partial file.
#[derive(Debug)]
pub struct ColumnarWriter {
    path: PathBuf,
    partial: PathBuf,
    out: Option<BufWriter<File>>,
    schema: Option<Vec<ColumnSchema>>,
    rows: usize,
    batches: usize,
    level: i32,
}

impl ColumnarWriter {
    /// Open `<path>.partial` for writing, creating parent directories.
    pub fn create(path: impl AsRef<Path>, level: i32) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        ensure_parent(&path)?;
        let partial = partial_path(&path);
        let file = File::create(&partial).map_err(|e| StorageError::io(&partial, e))?;
        let mut out = BufWriter::new(file);
        out.write_all(MAGIC)
            .map_err(|e| StorageError::io(&partial, e))?;

        debug!(path = %partial.display(), "Opened telemetry writer");
        Ok(Self {
            path,
            partial,
            out: Some(out),
            schema: None,
            rows: 0,
            batches: 0,
            level,
        })
    }

    pub const fn rows_written(&self) -> usize {
        self.rows
    }

    pub const fn batches_written(&self) -> usize {
        self.batches
    }

    fn write_frame(&mut self, kind: u8, payload: &[u8]) -> Result<(), StorageError> {
        let out = self.out.as_mut().ok_or_else(|| StorageError::Incomplete {
            path: self.partial.clone(),
            reason: "writer already closed".to_string(),
        })?;
        let len = payload.len() as u64;
        out.write_all(&[kind])
            .and_then(|()| out.write_all(&len.to_le_bytes()))
            .and_then(|()| out.write_all(payload))
            .map_err(|e| StorageError::io(&self.partial, e))
    }

    /// Commit: footer, fsync, rename, manifest.
    pub fn finish(mut self) -> Result<ArtifactManifest, StorageError> {
        let footer = serde_json::to_vec(&Footer {
            rows: self.rows,
            batches: self.batches,
        })?;
        if self.schema.is_none() {
            // An empty run still gets a schema frame so readers can open it
            let schema = serde_json::to_vec(&schema_of(&TelemetryTable::new()))?;
            self.write_frame(FRAME_SCHEMA, &schema)?;
            self.schema = Some(schema_of(&TelemetryTable::new()));
        }
        self.write_frame(FRAME_FOOTER, &footer)?;

        let out = self.out.take().ok_or_else(|| StorageError::Incomplete {
            path: self.partial.clone(),
            reason: "writer already closed".to_string(),
        })?;
        let file = out
            .into_inner()
            .map_err(|e| StorageError::io(&self.partial, e.into_error()))?;
        file.sync_all()
            .map_err(|e| StorageError::io(&self.partial, e))?;
        drop(file);

        fs::rename(&self.partial, &self.path).map_err(|e| StorageError::io(&self.path, e))?;
        let bytes = fs::metadata(&self.path)
            .map_err(|e| StorageError::io(&self.path, e))?
            .len();

        let manifest = ArtifactManifest {
            path: self.path.clone(),
            rows: self.rows,
            batches: self.batches,
            bytes,
            columns: self.schema.clone().unwrap_or_default(),
            completed_at: Utc::now(),
        };
        let sidecar = ArtifactManifest::sidecar_path(&self.path);
        fs::write(&sidecar, serde_json::to_vec_pretty(&manifest)?)
            .map_err(|e| StorageError::io(&sidecar, e))?;

        info!(
            path = %self.path.display(),
            rows = self.rows,
            batches = self.batches,
            size_mb = bytes as f64 / (1024.0 * 1024.0),
            "Telemetry artifact committed"
        );
        Ok(manifest)
    }

    /// Discard everything written so far.
    pub fn abort(mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        if self.out.take().is_some() {
            match fs::remove_file(&self.partial) {
                Ok(()) => warn!(
                    path = %self.partial.display(),
                    batches = self.batches,
                    "Discarded unfinished telemetry artifact"
                ),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %self.partial.display(), error = %e, "Failed to remove partial artifact"),
            }
        }
    }
}

impl BatchSink for ColumnarWriter {
    fn write_batch(&mut self, batch: &TelemetryTable) -> Result<(), StorageError> {
        let schema = schema_of(batch);
        match &self.schema {
            None => {
                let payload = serde_json::to_vec(&schema)?;
                self.write_frame(FRAME_SCHEMA, &payload)?;
                self.schema = Some(schema);
            }
            Some(committed) if *committed != schema => {
                return Err(StorageError::SchemaDrift {
                    batch: self.batches,
                    expected: column_names(committed),
                    found: column_names(&schema),
                });
            }
            Some(_) => {}
        }

        let json = serde_json::to_vec(&BatchFrame::encode(batch))?;
        let compressed =
            zstd::encode_all(json.as_slice(), self.level).map_err(|e| StorageError::io(&self.partial, e))?;
        self.write_frame(FRAME_BATCH, &compressed)?;

        self.rows += batch.len();
        self.batches += 1;
        debug!(
            batch = self.batches,
            rows = batch.len(),
            compressed_bytes = compressed.len(),
            "Wrote telemetry batch"
        );
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "columnar"
    }
}

impl Drop for ColumnarWriter {
    fn drop(&mut self) {
        self.discard();
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Reader for committed artifacts.
#[derive(Debug)]
pub struct ColumnarReader {
    path: PathBuf,
    schema: Vec<ColumnSchema>,
    batches: Vec<Vec<u8>>,
    footer: Footer,
}

impl ColumnarReader {
    /// Open and structurally verify an artifact.
    ///
    /// Fails when the footer is missing, when frames are truncated, or when
    /// the footer's batch count disagrees with the frames present.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| StorageError::io(&path, e))?;
        let mut input = BufReader::new(file);

        let mut magic = [0u8; 4];
        input
            .read_exact(&mut magic)
            .map_err(|_| StorageError::BadMagic(path.clone()))?;
        if &magic != MAGIC {
            return Err(StorageError::BadMagic(path));
        }

        let incomplete = |reason: &str| StorageError::Incomplete {
            path: path.clone(),
            reason: reason.to_string(),
        };

        let mut schema = None;
        let mut batches = Vec::new();
        let mut footer = None;

        loop {
            let mut kind = [0u8; 1];
            match input.read_exact(&mut kind) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(StorageError::io(&path, e)),
            }
            if footer.is_some() {
                return Err(incomplete("data after footer"));
            }

            let mut len = [0u8; 8];
            input
                .read_exact(&mut len)
                .map_err(|_| incomplete("truncated frame header"))?;
            let len = usize::try_from(u64::from_le_bytes(len))
                .map_err(|_| incomplete("frame length overflow"))?;
            let mut payload = vec![0u8; len];
            input
                .read_exact(&mut payload)
                .map_err(|_| incomplete("truncated frame payload"))?;

            match kind[0] {
                FRAME_SCHEMA if schema.is_none() => {
                    schema = Some(serde_json::from_slice::<Vec<ColumnSchema>>(&payload)?);
                }
                FRAME_BATCH if schema.is_some() => batches.push(payload),
                FRAME_FOOTER => footer = Some(serde_json::from_slice::<Footer>(&payload)?),
                other => return Err(incomplete(&format!("unexpected frame kind {other}"))),
            }
        }

        let footer = footer.ok_or_else(|| incomplete("missing footer"))?;
        let schema = schema.ok_or_else(|| incomplete("missing schema"))?;
        if footer.batches != batches.len() {
            return Err(incomplete(&format!(
                "footer declares {} batches, found {}",
                footer.batches,
                batches.len()
            )));
        }

        Ok(Self {
            path,
            schema,
            batches,
            footer,
        })
    }

    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    pub const fn rows(&self) -> usize {
        self.footer.rows
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Decode a single batch.
    pub fn read_batch(&self, index: usize) -> Result<TelemetryTable, StorageError> {
        let compressed = self.batches.get(index).ok_or_else(|| StorageError::Incomplete {
            path: self.path.clone(),
            reason: format!("batch {index} does not exist"),
        })?;
        let json = zstd::decode_all(compressed.as_slice()).map_err(|e| StorageError::io(&self.path, e))?;
        let frame: BatchFrame = serde_json::from_slice(&json)?;
        frame.decode(&self.schema, &self.path)
    }

    /// Decode every batch into one table and verify the footer row count.
    pub fn read_all(&self) -> Result<TelemetryTable, StorageError> {
        let mut table = TelemetryTable::with_capacity(self.footer.rows);
        for index in 0..self.batches.len() {
            table.extend_from(&self.read_batch(index)?)?;
        }
        if table.len() != self.footer.rows {
            return Err(StorageError::Incomplete {
                path: self.path.clone(),
                reason: format!(
                    "footer declares {} rows, batches hold {}",
                    self.footer.rows,
                    table.len()
                ),
            });
        }
        info!(path = %self.path.display(), rows = table.len(), "Loaded telemetry artifact");
        Ok(table)
    }
}

/// Open and fully decode an artifact.
pub fn read_telemetry(path: impl AsRef<Path>) -> Result<TelemetryTable, StorageError> {
    ColumnarReader::open(path)?.read_all()
}
