//! Dashboard boundary
//!
//! Stratified subsample: each risk class keeps its share of `target_rows`
//! (floored), but a class present in the input is never sampled away
//! entirely. Rows are drawn without replacement and the result is shuffled.
//!
//! The core only emits canonical channel names. Dashboard pages read
//! short names, so [`with_dashboard_aliases`] adds copies under those names
//! at this boundary and nowhere else.

use rand::seq::{index, SliceRandom};
use tracing::info;

use crate::seed::{RunSeed, Stream};
use crate::types::{label_columns, FeatureColumn, FeatureFrame, RiskLevel, SensorChannel, TableError};

/// Short names read by dashboard consumers, keyed by canonical channel.
pub const DASHBOARD_ALIASES: [(SensorChannel, &str); 2] = [
    (SensorChannel::TemperatureTop, "temperature"),
    (SensorChannel::VibrationX, "vibration"),
];

/// Add alias columns for [`DASHBOARD_ALIASES`]. Existing alias columns are
/// left alone.
pub fn with_dashboard_aliases(frame: FeatureFrame) -> Result<FeatureFrame, TableError> {
    let mut aliases = Vec::with_capacity(DASHBOARD_ALIASES.len());
    for (channel, alias) in DASHBOARD_ALIASES {
        if frame.has_column(alias) {
            continue;
        }
        aliases.push(FeatureColumn::new(alias, frame.channel(channel)?.to_vec()));
    }
    frame.with_columns(aliases)
}

/// Subsample `frame` to about `target_rows` rows, stratified by `risk_level`.
///
/// Frames no larger than `target_rows` are returned unchanged.
pub fn stratified_sample(
    frame: &FeatureFrame,
    target_rows: usize,
    seed: RunSeed,
) -> Result<FeatureFrame, TableError> {
    let levels = frame.require(label_columns::RISK_LEVEL)?;
    if frame.len() <= target_rows {
        return Ok(frame.clone());
    }

    let total = frame.len() as f64;
    let mut rows = Vec::with_capacity(target_rows + 3);
    for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High] {
        let class: Vec<usize> = (0..frame.len())
            .filter(|&r| levels[r] == f64::from(level.as_u8()))
            .collect();
        if class.is_empty() {
            continue;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let quota = ((target_rows as f64 * class.len() as f64 / total) as usize)
            .max(1)
            .min(class.len());
        let mut rng = seed.rng(Stream::Sampling, u64::from(level.as_u8()), 0);
        rows.extend(
            index::sample(&mut rng, class.len(), quota)
                .into_iter()
                .map(|i| class[i]),
        );
    }
    rows.shuffle(&mut seed.stream(Stream::Sampling));

    info!(rows_in = frame.len(), rows_out = rows.len(), "Stratified sample drawn");
    Ok(frame.select_rows(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EquipmentId;
    use chrono::NaiveDate;

    fn frame(low: usize, medium: usize, high: usize) -> FeatureFrame {
        let levels: Vec<f64> = std::iter::repeat(0.0)
            .take(low)
            .chain(std::iter::repeat(1.0).take(medium))
            .chain(std::iter::repeat(2.0).take(high))
            .collect();
        let n = levels.len();
        let ts = NaiveDate::from_ymd_opt(2023, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        FeatureFrame::new(
            vec![ts; n],
            vec![EquipmentId::new(1, 1); n],
            vec![FeatureColumn::new(label_columns::RISK_LEVEL, levels)],
        )
        .unwrap()
    }

    fn count(frame: &FeatureFrame, level: f64) -> usize {
        frame
            .column(label_columns::RISK_LEVEL)
            .unwrap()
            .iter()
            .filter(|&&l| l == level)
            .count()
    }

    #[test]
    fn test_proportions_preserved() {
        let out = stratified_sample(&frame(700, 200, 100), 100, RunSeed::new(42)).unwrap();
        assert_eq!(out.len(), 100);
        assert_eq!(count(&out, 0.0), 70);
        assert_eq!(count(&out, 1.0), 20);
        assert_eq!(count(&out, 2.0), 10);
    }

    #[test]
    fn test_rare_class_kept() {
        let out = stratified_sample(&frame(997, 0, 3), 10, RunSeed::new(1)).unwrap();
        assert_eq!(count(&out, 2.0), 1);
        assert_eq!(count(&out, 1.0), 0);
    }

    #[test]
    fn test_small_frame_unchanged() {
        let input = frame(5, 2, 1);
        assert_eq!(stratified_sample(&input, 100, RunSeed::new(1)).unwrap(), input);
    }

    #[test]
    fn test_aliases_copy_canonical_channels() {
        let ts = NaiveDate::from_ymd_opt(2023, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let input = FeatureFrame::new(
            vec![ts; 2],
            vec![EquipmentId::new(1, 1); 2],
            vec![
                FeatureColumn::new("temperature_top", vec![60.0, 70.0]),
                FeatureColumn::new("vibration_x", vec![2.0, 3.0]),
                FeatureColumn::new("vibration", vec![9.0, 9.0]),
            ],
        )
        .unwrap();
        let out = with_dashboard_aliases(input).unwrap();
        assert_eq!(out.column("temperature").unwrap(), &[60.0, 70.0]);
        assert_eq!(out.column("vibration").unwrap(), &[9.0, 9.0]);
        assert_eq!(out.width(), 4);
    }

    #[test]
    fn test_aliases_need_canonical_channel() {
        let input = frame(1, 0, 0);
        assert!(with_dashboard_aliases(input).is_err());
    }

    #[test]
    fn test_deterministic() {
        let input = frame(300, 50, 20);
        assert_eq!(
            stratified_sample(&input, 37, RunSeed::new(5)).unwrap(),
            stratified_sample(&input, 37, RunSeed::new(5)).unwrap()
        );
    }
}
