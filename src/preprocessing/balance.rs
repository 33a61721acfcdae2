//! Class balancing on the finished feature frame
//!
//! - Undersample: keep every failure row, draw `failures / ratio` normal rows
//!   without replacement
//! - Oversample: keep every normal row, replicate the failure rows an integer
//!   number of times towards `normal * ratio` (at least once)
//!
//! The balanced frame is shuffled with the balancing RNG stream.

use rand::seq::{index, SliceRandom};
use serde::Serialize;
use tracing::info;

use super::{DataQualityReport, DataQualityWarning};
use crate::config::BalanceMethod;
use crate::seed::{RunSeed, Stream};
use crate::types::{label_columns, FeatureFrame, TableError};

/// Class counts before and after balancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceSummary {
    pub failures_before: usize,
    pub rows_before: usize,
    pub failures_after: usize,
    pub rows_after: usize,
}

/// Rebalance `frame` on its `failure` column.
///
/// With [`BalanceMethod::None`] the frame is returned as is, `failure`
/// column or not. Otherwise a missing `failure` column is an error, and a
/// frame with only one class present is returned unchanged with a warning.
pub fn balance_frame(
    frame: FeatureFrame,
    method: BalanceMethod,
    ratio: f64,
    seed: RunSeed,
    report: &mut DataQualityReport,
) -> Result<(FeatureFrame, BalanceSummary), TableError> {
    if method == BalanceMethod::None {
        let failures = frame
            .column(label_columns::FAILURE)
            .map_or(0, |f| f.iter().filter(|&&v| v >= 0.5).count());
        let rows = frame.len();
        let summary = BalanceSummary {
            failures_before: failures,
            rows_before: rows,
            failures_after: failures,
            rows_after: rows,
        };
        return Ok((frame, summary));
    }

    let failure = frame.require(label_columns::FAILURE)?;
    let (failures, normal): (Vec<usize>, Vec<usize>) =
        (0..frame.len()).partition(|&row| failure[row] >= 0.5);

    let unchanged = BalanceSummary {
        failures_before: failures.len(),
        rows_before: frame.len(),
        failures_after: failures.len(),
        rows_after: frame.len(),
    };
    let skip_reason = if failures.is_empty() {
        Some("no failure rows".to_string())
    } else if normal.is_empty() {
        Some("no normal rows".to_string())
    } else if !(ratio > 0.0 && ratio.is_finite()) {
        Some(format!("ratio {ratio} is not positive"))
    } else {
        None
    };
    if let Some(reason) = skip_reason {
        report.push(DataQualityWarning::BalanceSkipped { reason });
        return Ok((frame, unchanged));
    }

    let mut rng = seed.stream(Stream::Balancing);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut rows = match method {
        BalanceMethod::Undersample => {
            let target = (failures.len() as f64 / ratio).floor() as usize;
            let keep = target.min(normal.len());
            let mut rows = failures.clone();
            rows.extend(index::sample(&mut rng, normal.len(), keep).into_iter().map(|i| normal[i]));
            rows
        }
        BalanceMethod::Oversample => {
            let target = (normal.len() as f64 * ratio).floor() as usize;
            let factor = (target / failures.len()).max(1);
            let mut rows = normal.clone();
            for _ in 0..factor {
                rows.extend_from_slice(&failures);
            }
            rows
        }
        BalanceMethod::None => (0..frame.len()).collect(),
    };
    rows.shuffle(&mut rng);

    let balanced = frame.select_rows(&rows);
    let failures_after = balanced
        .require(label_columns::FAILURE)?
        .iter()
        .filter(|&&f| f >= 0.5)
        .count();
    let summary = BalanceSummary {
        failures_before: failures.len(),
        rows_before: frame.len(),
        failures_after,
        rows_after: balanced.len(),
    };
    info!(
        method = ?method,
        rows_before = summary.rows_before,
        rows_after = summary.rows_after,
        failures_after,
        "Classes balanced"
    );
    Ok((balanced, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EquipmentId, FeatureColumn};
    use chrono::NaiveDate;

    /// `failures` failure rows followed by `normal` normal rows.
    fn frame(failures: usize, normal: usize) -> FeatureFrame {
        let n = failures + normal;
        let t0 = NaiveDate::from_ymd_opt(2023, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        FeatureFrame::new(
            vec![t0; n],
            (0..n).map(|i| EquipmentId::from_raw(format!("U{i:03}"))).collect(),
            vec![
                FeatureColumn::new("row", (0..n).map(|i| i as f64).collect()),
                FeatureColumn::new(
                    label_columns::FAILURE,
                    (0..n).map(|i| if i < failures { 1.0 } else { 0.0 }).collect(),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_undersample_keeps_all_failures() {
        let mut report = DataQualityReport::new();
        let (out, summary) =
            balance_frame(frame(3, 100), BalanceMethod::Undersample, 0.3, RunSeed::new(42), &mut report)
                .unwrap();
        // 3 / 0.3 = 10 normal rows
        assert_eq!(summary.rows_after, 13);
        assert_eq!(summary.failures_after, 3);
        assert_eq!(out.len(), 13);
        assert!(report.is_empty());
    }

    #[test]
    fn test_oversample_replicates_failures() {
        let mut report = DataQualityReport::new();
        let (_, summary) =
            balance_frame(frame(2, 100), BalanceMethod::Oversample, 0.3, RunSeed::new(42), &mut report)
                .unwrap();
        // 100 * 0.3 = 30 -> factor 15
        assert_eq!(summary.failures_after, 30);
        assert_eq!(summary.rows_after, 130);
    }

    #[test]
    fn test_oversample_factor_never_drops_failures() {
        let mut report = DataQualityReport::new();
        let (_, summary) =
            balance_frame(frame(50, 10), BalanceMethod::Oversample, 0.3, RunSeed::new(1), &mut report)
                .unwrap();
        assert_eq!(summary.failures_after, 50);
    }

    #[test]
    fn test_balance_is_deterministic() {
        let run = || {
            let mut report = DataQualityReport::new();
            balance_frame(frame(5, 60), BalanceMethod::Undersample, 0.5, RunSeed::new(7), &mut report)
                .unwrap()
                .0
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_single_class_is_skipped() {
        let mut report = DataQualityReport::new();
        let input = frame(0, 10);
        let (out, _) =
            balance_frame(input.clone(), BalanceMethod::Undersample, 0.3, RunSeed::new(1), &mut report)
                .unwrap();
        assert_eq!(out, input);
        assert!(report.contains(|w| matches!(w, DataQualityWarning::BalanceSkipped { .. })));
    }

    #[test]
    fn test_missing_failure_column_is_error() {
        let mut report = DataQualityReport::new();
        let input = frame(1, 1).without_columns(&[label_columns::FAILURE]);
        assert_eq!(
            balance_frame(input, BalanceMethod::Oversample, 0.3, RunSeed::new(1), &mut report),
            Err(TableError::MissingColumn(label_columns::FAILURE.to_string()))
        );
    }

    #[test]
    fn test_no_balancing_needs_no_failure_column() {
        let mut report = DataQualityReport::new();
        let input = frame(2, 5).without_columns(&[label_columns::FAILURE]);
        let (out, summary) =
            balance_frame(input.clone(), BalanceMethod::None, 0.3, RunSeed::new(1), &mut report)
                .unwrap();
        assert_eq!(out, input);
        assert_eq!(summary.rows_after, 7);
        assert_eq!(summary.failures_after, 0);
        assert!(report.is_empty());
    }
}
