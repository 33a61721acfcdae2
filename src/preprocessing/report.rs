//! Data-quality warnings
//!
//! Non-fatal findings that were corrected by a documented policy. Every
//! warning is logged when it is recorded; none of them aborts a stage.

use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::types::SensorChannel;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// Values were missing before cleaning and have been filled
    MissingValues { channel: SensorChannel, count: usize },
    /// A channel had no observed value at all; filled with 0
    ChannelEmpty { channel: SensorChannel },
    /// Values outside the outlier bounds were capped
    OutliersCapped {
        channel: SensorChannel,
        count: usize,
        lower: f64,
        upper: f64,
    },
    DuplicateRows { count: usize },
    /// Negative readings on a non-negative channel, clamped to 0
    NegativeValues { channel: SensorChannel, count: usize },
    LowFailureRate { rate: f64, threshold: f64 },
    ZeroVariance { channel: SensorChannel },
    /// No row met a high-risk rule; labels came from score quantiles
    QuantileFallback { high_rows: usize, medium_rows: usize },
    /// Too many distinct units for one-hot encoding
    OneHotSkipped { cardinality: usize, limit: usize },
    /// Balancing requested but impossible with the present classes
    BalanceSkipped { reason: String },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingValues { channel, count } => {
                write!(f, "{count} missing values in {channel} filled")
            }
            Self::ChannelEmpty { channel } => {
                write!(f, "{channel} has no observed values, filled with 0")
            }
            Self::OutliersCapped {
                channel,
                count,
                lower,
                upper,
            } => write!(
                f,
                "{count} outliers in {channel} capped to [{lower:.3}, {upper:.3}]"
            ),
            Self::DuplicateRows { count } => write!(f, "{count} duplicate rows removed"),
            Self::NegativeValues { channel, count } => {
                write!(f, "{count} negative values in {channel} clamped to 0")
            }
            Self::LowFailureRate { rate, threshold } => write!(
                f,
                "failure rate {:.2}% is below {:.2}%",
                rate * 100.0,
                threshold * 100.0
            ),
            Self::ZeroVariance { channel } => write!(f, "{channel} has zero variance"),
            Self::QuantileFallback {
                high_rows,
                medium_rows,
            } => write!(
                f,
                "no rule-based high-risk rows; quantile fallback labeled {high_rows} high, {medium_rows} medium"
            ),
            Self::OneHotSkipped { cardinality, limit } => write!(
                f,
                "one-hot encoding skipped: {cardinality} units exceeds limit {limit}"
            ),
            Self::BalanceSkipped { reason } => write!(f, "class balancing skipped: {reason}"),
        }
    }
}

/// Warnings collected by a stage, in the order they were raised.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataQualityReport {
    warnings: Vec<DataQualityWarning>,
}

impl DataQualityReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a warning.
    pub fn push(&mut self, warning: DataQualityWarning) {
        warn!(warning = %warning, "Data quality");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Append another report without logging its warnings a second time.
    pub fn merge(&mut self, other: DataQualityReport) {
        self.warnings.extend(other.warnings);
    }

    pub fn contains(&self, predicate: impl Fn(&DataQualityWarning) -> bool) -> bool {
        self.warnings.iter().any(predicate)
    }
}
