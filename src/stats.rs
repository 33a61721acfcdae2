//! Column statistics shared by the preprocessor, the labeler and the
//! feature stages. `NaN` entries are ignored throughout.

use statrs::statistics::{Data, OrderStatistics, Statistics};

fn observed(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

/// Linear-interpolation sample quantile at `h = (n - 1) * tau` over the
/// statrs order statistics. `None` when nothing is observed.
pub(crate) fn quantile(values: &[f64], tau: f64) -> Option<f64> {
    let finite = observed(values);
    if finite.is_empty() {
        return None;
    }
    let n = finite.len();
    let mut data = Data::new(finite);

    #[allow(clippy::cast_precision_loss)]
    let h = (n - 1) as f64 * tau.clamp(0.0, 1.0);
    let floor = h.floor();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let below_rank = floor as usize + 1;
    let below = data.order_statistic(below_rank);
    let fraction = h - floor;
    if fraction == 0.0 || below_rank == n {
        return Some(below);
    }
    let above = data.order_statistic(below_rank + 1);
    Some(below + fraction * (above - below))
}

pub(crate) fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Mean and sample standard deviation. The deviation of a single value is 0.
pub(crate) fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    let finite = observed(values);
    match finite.len() {
        0 => None,
        1 => Some((finite[0], 0.0)),
        _ => Some((finite.iter().mean(), finite.iter().std_dev())),
    }
}
