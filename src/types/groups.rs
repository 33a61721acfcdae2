//! Per-equipment, time-ordered row grouping
//!
//! Every grouped computation (fill, rolling, lag, difference, statistics)
//! builds its own [`EquipmentGroups`] from the key columns instead of trusting
//! the current row order. Results are scattered back to the original row
//! positions, so a caller never observes a reordering.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::ops::Range;

use super::EquipmentId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipmentGroups {
    /// Row indices sorted by (equipment, timestamp), stable for ties
    order: Vec<usize>,
    /// One contiguous range of `order` per equipment unit
    runs: Vec<Range<usize>>,
}

impl EquipmentGroups {
    pub fn new(equipment_ids: &[EquipmentId], timestamps: &[NaiveDateTime]) -> Self {
        let mut order: Vec<usize> = (0..equipment_ids.len()).collect();
        order.sort_by(|&a, &b| {
            equipment_ids[a]
                .cmp(&equipment_ids[b])
                .then(timestamps[a].cmp(&timestamps[b]))
        });

        let mut runs = Vec::new();
        let mut start = 0;
        for i in 1..=order.len() {
            if i == order.len() || equipment_ids[order[i]] != equipment_ids[order[start]] {
                runs.push(start..i);
                start = i;
            }
        }
        Self { order, runs }
    }

    /// All row indices in (equipment, timestamp) order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Number of distinct equipment units.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Row indices of each unit, time-ordered.
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.runs.iter().map(|r| &self.order[r.clone()])
    }

    /// Apply `f` to each unit's time-ordered series of `values` and scatter
    /// the per-row results back to their original positions.
    ///
    /// `f` must return one value per input value.
    pub fn map_series<F>(&self, values: &[f64], f: F) -> Vec<f64>
    where
        F: Fn(&[f64]) -> Vec<f64> + Sync,
    {
        let mapped: Vec<Vec<f64>> = self
            .runs
            .par_iter()
            .map(|run| {
                let series: Vec<f64> = self.order[run.clone()].iter().map(|&r| values[r]).collect();
                f(&series)
            })
            .collect();

        let mut out = vec![f64::NAN; values.len()];
        for (rows, result) in self.iter().zip(mapped) {
            for (&row, value) in rows.iter().zip(result) {
                out[row] = value;
            }
        }
        out
    }
}
