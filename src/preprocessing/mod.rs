//! Preprocessor: cleaning between generation and labeling
//!
//! Steps, in order:
//!
//! 1. Missing values: forward fill then backward fill within each unit's time
//!    order, then the column median
//! 2. Outlier capping per channel (IQR or z-score bounds); label columns are
//!    never touched
//! 3. Exact duplicate rows removed (first occurrence kept)
//! 4. Negative readings clamped to 0 on non-negative channels
//! 5. Low failure rate and zero-variance checks
//!
//! Every correction is reported as a [`DataQualityWarning`]; cleaning never
//! fails. Class balancing runs later, on the finished feature frame.

mod balance;
mod report;

pub use balance::{balance_frame, BalanceSummary};
pub use report::{DataQualityReport, DataQualityWarning};

use std::collections::HashSet;
use tracing::{debug, info};

use crate::config::{OutlierMethod, PreprocessingConfig};
use crate::seed::RunSeed;
use crate::stats;
use crate::types::{FeatureFrame, RiskDistribution, SensorChannel, TableError, TelemetryTable};

/// Cleaned table plus everything that was corrected on the way.
#[derive(Debug, Clone)]
pub struct PreprocessOutcome {
    pub table: TelemetryTable,
    pub report: DataQualityReport,
}

pub struct Preprocessor {
    config: PreprocessingConfig,
}

impl Preprocessor {
    pub fn new(config: &PreprocessingConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    /// Run every cleaning step over `table`.
    pub fn clean(&self, mut table: TelemetryTable) -> PreprocessOutcome {
        let rows_in = table.len();
        let mut report = DataQualityReport::new();

        fill_missing(&mut table, &mut report);
        self.cap_outliers(&mut table, &mut report);
        let mut table = drop_duplicates(table, &mut report);
        clamp_negatives(&mut table, &mut report);
        self.check_failure_rate(&table, &mut report);
        check_zero_variance(&table, &mut report);

        info!(
            rows_in,
            rows_out = table.len(),
            warnings = report.len(),
            "Preprocessing complete"
        );
        PreprocessOutcome { table, report }
    }

    /// Balance a finished feature frame with the configured method and ratio.
    pub fn balance(
        &self,
        frame: FeatureFrame,
        seed: RunSeed,
        report: &mut DataQualityReport,
    ) -> Result<(FeatureFrame, BalanceSummary), TableError> {
        balance_frame(
            frame,
            self.config.balance_method,
            self.config.balance_ratio,
            seed,
            report,
        )
    }

    /// `(lower, upper)` bounds for one channel under the configured method.
    fn outlier_bounds(&self, values: &[f64]) -> Option<(f64, f64)> {
        match self.config.outlier_method {
            OutlierMethod::None => None,
            OutlierMethod::Iqr => {
                let q1 = stats::quantile(values, 0.25)?;
                let q3 = stats::quantile(values, 0.75)?;
                let spread = self.config.iqr_multiplier * (q3 - q1);
                Some((q1 - spread, q3 + spread))
            }
            OutlierMethod::Zscore => {
                let (mean, std) = stats::mean_std(values)?;
                if std <= 0.0 || !std.is_finite() {
                    return None;
                }
                let spread = self.config.zscore_threshold * std;
                Some((mean - spread, mean + spread))
            }
        }
    }

    fn cap_outliers(&self, table: &mut TelemetryTable, report: &mut DataQualityReport) {
        for channel in SensorChannel::ALL {
            let Some((lower, upper)) = self.outlier_bounds(table.channel(channel)) else {
                continue;
            };
            let mut count = 0;
            for value in table.channel_mut(channel).iter_mut() {
                if *value < lower || *value > upper {
                    *value = value.clamp(lower, upper);
                    count += 1;
                }
            }
            if count > 0 {
                report.push(DataQualityWarning::OutliersCapped {
                    channel,
                    count,
                    lower,
                    upper,
                });
            }
        }
    }

    fn check_failure_rate(&self, table: &TelemetryTable, report: &mut DataQualityReport) {
        let Some(labels) = table.labels() else {
            return;
        };
        if labels.is_empty() {
            return;
        }
        let rate = RiskDistribution::from_levels(&labels.risk_level).failure_rate();
        if rate < self.config.low_failure_rate {
            report.push(DataQualityWarning::LowFailureRate {
                rate,
                threshold: self.config.low_failure_rate,
            });
        }
    }
}

fn fill_missing(table: &mut TelemetryTable, report: &mut DataQualityReport) {
    let groups = table.groups();

    for channel in SensorChannel::ALL {
        let missing = table.channel(channel).iter().filter(|v| v.is_nan()).count();
        if missing == 0 {
            continue;
        }
        let column = table.channel_mut(channel);

        for rows in groups.iter() {
            let mut last = None;
            for &r in rows {
                match (column[r].is_nan(), last) {
                    (true, Some(v)) => column[r] = v,
                    (false, _) => last = Some(column[r]),
                    (true, None) => {}
                }
            }
            let mut next = None;
            for &r in rows.iter().rev() {
                match (column[r].is_nan(), next) {
                    (true, Some(v)) => column[r] = v,
                    (false, _) => next = Some(column[r]),
                    (true, None) => {}
                }
            }
        }

        // Units with no observation at all on this channel
        if column.iter().any(|v| v.is_nan()) {
            let fill = match stats::median(column) {
                Some(m) => m,
                None => {
                    report.push(DataQualityWarning::ChannelEmpty { channel });
                    0.0
                }
            };
            for value in column.iter_mut().filter(|v| v.is_nan()) {
                *value = fill;
            }
        }

        report.push(DataQualityWarning::MissingValues {
            channel,
            count: missing,
        });
    }
}

fn drop_duplicates(table: TelemetryTable, report: &mut DataQualityReport) -> TelemetryTable {
    let keep = {
        let mut seen = HashSet::with_capacity(table.len());
        let mut keep = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            let mut bits: Vec<u64> = table.readings(row).iter().map(|v| v.to_bits()).collect();
            if let Some(labels) = table.labels() {
                bits.push(labels.failure_probability[row].to_bits());
                bits.push(u64::from(labels.risk_level[row].as_u8()));
            }
            let key = (
                table.equipment_ids()[row].as_str(),
                table.timestamps()[row],
                bits,
            );
            if seen.insert(key) {
                keep.push(row);
            }
        }
        keep
    };

    let dropped = table.len() - keep.len();
    if dropped == 0 {
        return table;
    }
    report.push(DataQualityWarning::DuplicateRows { count: dropped });
    table.select_rows(&keep)
}

fn clamp_negatives(table: &mut TelemetryTable, report: &mut DataQualityReport) {
    for channel in SensorChannel::ALL {
        if !channel.requires_non_negative() {
            continue;
        }
        let mut count = 0;
        for value in table.channel_mut(channel).iter_mut() {
            if *value < 0.0 {
                *value = 0.0;
                count += 1;
            }
        }
        if count > 0 {
            report.push(DataQualityWarning::NegativeValues { channel, count });
        }
    }
}

fn check_zero_variance(table: &TelemetryTable, report: &mut DataQualityReport) {
    if table.len() < 2 {
        return;
    }
    for channel in SensorChannel::ALL {
        let column = table.channel(channel);
        let (min, max) = column
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if min == max {
            debug!(channel = %channel, value = min, "Constant channel");
            report.push(DataQualityWarning::ZeroVariance { channel });
        }
    }
}
