//! Risk Labeler
//!
//! Attaches `failure_probability`, `risk_level` and `failure` to every row of
//! a telemetry table in one pass:
//!
//! 1. Score each row (weighted, normalized DGA / temperature / vibration)
//! 2. Rule level: high predicate first, medium only for rows not already high
//! 3. If no row in the whole table is high, relabel from score quantiles:
//!    rows at or above the high quantile become high, rows between the
//!    medium and high quantiles become medium, the rest keep their rule level
//!
//! Labels are computed once and never revised afterwards.

mod rules;

pub use rules::RiskRules;

use rayon::prelude::*;
use tracing::info;

use crate::config::{GuardianConfig, LabelingConfig};
use crate::preprocessing::{DataQualityReport, DataQualityWarning};
use crate::stats;
use crate::types::{RiskColumns, RiskDistribution, RiskLevel, TableError, TelemetryTable};

#[derive(Debug, Clone)]
pub struct LabelOutcome {
    pub table: TelemetryTable,
    pub distribution: RiskDistribution,
    /// True when the quantile fallback produced the labels
    pub fallback_used: bool,
    pub report: DataQualityReport,
}

pub struct RiskLabeler {
    rules: RiskRules,
    labeling: LabelingConfig,
}

impl RiskLabeler {
    pub fn new(config: &GuardianConfig) -> Self {
        Self {
            rules: RiskRules::new(&config.thresholds, &config.score_weights),
            labeling: config.labeling.clone(),
        }
    }

    pub fn rules(&self) -> &RiskRules {
        &self.rules
    }

    /// Label `table`, replacing any labels it already carries.
    ///
    /// An empty table is returned empty with an all-zero distribution.
    pub fn label(&self, table: TelemetryTable) -> Result<LabelOutcome, TableError> {
        let mut report = DataQualityReport::new();

        let (probabilities, mut levels): (Vec<f64>, Vec<RiskLevel>) = (0..table.len())
            .into_par_iter()
            .map(|row| {
                let readings = table.readings(row);
                (
                    self.rules.failure_probability(&readings),
                    self.rules.level(&readings),
                )
            })
            .unzip();

        let rule_high = levels.iter().filter(|&&l| l == RiskLevel::High).count();
        let fallback_used = !table.is_empty() && rule_high == 0;
        if fallback_used {
            self.apply_quantile_fallback(&probabilities, &mut levels);
            let dist = RiskDistribution::from_levels(&levels);
            report.push(DataQualityWarning::QuantileFallback {
                high_rows: dist.high,
                medium_rows: dist.medium,
            });
        }

        let mut labels = RiskColumns::with_capacity(levels.len());
        for (&p, &level) in probabilities.iter().zip(&levels) {
            labels.push(p, level);
        }
        let distribution = RiskDistribution::from_levels(&levels);
        info!(
            rows = distribution.total(),
            low = distribution.low,
            medium = distribution.medium,
            high = distribution.high,
            failure_rate = format!("{:.2}%", distribution.failure_rate() * 100.0),
            fallback_used,
            "Risk labels attached"
        );

        Ok(LabelOutcome {
            table: table.without_labels().with_labels(labels)?,
            distribution,
            fallback_used,
            report,
        })
    }

    fn apply_quantile_fallback(&self, probabilities: &[f64], levels: &mut [RiskLevel]) {
        let (Some(high), Some(medium)) = (
            stats::quantile(probabilities, self.labeling.high_quantile),
            stats::quantile(probabilities, self.labeling.medium_quantile),
        ) else {
            return;
        };
        for (&p, level) in probabilities.iter().zip(levels.iter_mut()) {
            if p >= high {
                *level = RiskLevel::High;
            } else if p >= medium {
                *level = RiskLevel::Medium;
            }
        }
    }
}
