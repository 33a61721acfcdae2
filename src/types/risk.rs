//! Risk label types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal risk classification attached to a telemetry row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Normal operation
    #[default]
    Low,
    /// Warning conditions present
    Medium,
    /// Critical conditions, likely failure
    High,
}

impl RiskLevel {
    pub const fn as_u8(self) -> u8 {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 1,
            RiskLevel::High => 2,
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(RiskLevel::Low),
            1 => Some(RiskLevel::Medium),
            2 => Some(RiskLevel::High),
            _ => None,
        }
    }

    /// Binary failure flag: 1 iff the row is high risk.
    pub const fn failure_flag(self) -> u8 {
        match self {
            RiskLevel::High => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// The three label columns attached to a table by the risk labeler.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskColumns {
    /// Composite score in [0, 1]
    pub failure_probability: Vec<f64>,
    /// Ordinal risk class
    pub risk_level: Vec<RiskLevel>,
    /// 1 iff `risk_level == High`
    pub failure: Vec<u8>,
}

impl RiskColumns {
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            failure_probability: Vec::with_capacity(rows),
            risk_level: Vec::with_capacity(rows),
            failure: Vec::with_capacity(rows),
        }
    }

    pub fn len(&self) -> usize {
        self.risk_level.len()
    }

    pub fn is_empty(&self) -> bool {
        self.risk_level.is_empty()
    }

    pub fn push(&mut self, probability: f64, level: RiskLevel) {
        self.failure_probability.push(probability);
        self.risk_level.push(level);
        self.failure.push(level.failure_flag());
    }

    /// Overwrite the level of one row, keeping `failure` consistent.
    pub fn set_level(&mut self, row: usize, level: RiskLevel) {
        self.risk_level[row] = level;
        self.failure[row] = level.failure_flag();
    }

    pub(crate) fn select(&self, rows: &[usize]) -> Self {
        Self {
            failure_probability: rows.iter().map(|&r| self.failure_probability[r]).collect(),
            risk_level: rows.iter().map(|&r| self.risk_level[r]).collect(),
            failure: rows.iter().map(|&r| self.failure[r]).collect(),
        }
    }
}

/// Row counts per risk class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl RiskDistribution {
    pub fn from_levels(levels: &[RiskLevel]) -> Self {
        let mut dist = Self::default();
        for level in levels {
            match level {
                RiskLevel::Low => dist.low += 1,
                RiskLevel::Medium => dist.medium += 1,
                RiskLevel::High => dist.high += 1,
            }
        }
        dist
    }

    pub const fn total(&self) -> usize {
        self.low + self.medium + self.high
    }

    /// Fraction of rows flagged as failures.
    pub fn failure_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.high as f64 / self.total() as f64
        }
    }
}
