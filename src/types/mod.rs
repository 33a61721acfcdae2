//! Shared data structures for the telemetry → labels → features pipeline
//!
//! - `SensorChannel`: the canonical 16-channel schema
//! - `EquipmentId`: grouping key for every per-entity computation
//! - `EquipmentGroups`: per-unit, time-ordered row index runs
//! - `TelemetryTable`: raw / cleaned / labeled telemetry, column-oriented
//! - `RiskLevel`, `RiskColumns`: labels attached by the risk labeler
//! - `FeatureFrame`: wide table produced by feature engineering

mod channel;
mod equipment;
mod frame;
mod groups;
mod risk;
mod telemetry;

pub use channel::*;
pub use equipment::*;
pub use frame::*;
pub use groups::*;
pub use risk::*;
pub use telemetry::*;
