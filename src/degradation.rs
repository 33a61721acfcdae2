//! Degradation Model
//!
//! Per-unit stochastic severity curve in [0, 1]. A unit either stays healthy
//! for the whole run (all zeros) or degrades exactly once: a quadratic ramp
//! from a random onset hour to a random failure hour, then 1.0 until the end.
//! The quadratic shape models accelerating wear.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DegradationError {
    #[error("total_hours must be > 0")]
    NoHours,
    #[error("degradation probability {0} is outside [0, 1]")]
    InvalidProbability(f64),
    #[error("onset window [{min}, {max}) is empty")]
    EmptyOnsetWindow { min: usize, max: usize },
    #[error("failure window start {0} is outside [0, 1)")]
    InvalidFailureWindow(f64),
}

/// Hours bounding the single degradation episode of a failing unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradationEpisode {
    /// First hour of the ramp (severity 0.0 at this hour)
    pub onset_hour: usize,
    /// First hour at severity 1.0
    pub failure_hour: usize,
}

/// Severity per hour index for one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct DegradationPattern {
    severity: Vec<f64>,
    episode: Option<DegradationEpisode>,
}

impl DegradationPattern {
    /// All-zero pattern.
    pub fn healthy(total_hours: usize) -> Self {
        Self {
            severity: vec![0.0; total_hours],
            episode: None,
        }
    }

    /// Pattern with one episode; hours are clamped into the run.
    pub fn with_episode(total_hours: usize, onset_hour: usize, failure_hour: usize) -> Self {
        let failure_hour = failure_hour.min(total_hours);
        let onset_hour = onset_hour.min(failure_hour);
        let mut severity = vec![0.0; total_hours];

        let span = (failure_hour - onset_hour) as f64;
        for (i, s) in severity
            .iter_mut()
            .enumerate()
            .take(failure_hour)
            .skip(onset_hour)
        {
            let progress = (i - onset_hour) as f64 / span;
            *s = progress * progress;
        }
        for s in &mut severity[failure_hour..] {
            *s = 1.0;
        }

        Self {
            severity,
            episode: Some(DegradationEpisode {
                onset_hour,
                failure_hour,
            }),
        }
    }

    pub fn severity(&self) -> &[f64] {
        &self.severity
    }

    pub fn len(&self) -> usize {
        self.severity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.severity.is_empty()
    }

    pub const fn episode(&self) -> Option<DegradationEpisode> {
        self.episode
    }

    pub const fn is_failing(&self) -> bool {
        self.episode.is_some()
    }

    /// Severity for hours `[start, start + len)`, truncated at the end of the run.
    pub fn window(&self, start: usize, len: usize) -> &[f64] {
        let start = start.min(self.severity.len());
        let end = start.saturating_add(len).min(self.severity.len());
        &self.severity[start..end]
    }
}

/// Draws degradation patterns.
#[derive(Debug, Clone, PartialEq)]
pub struct DegradationModel {
    probability: f64,
    onset_min_hours: usize,
    onset_max_hours: usize,
    failure_window_start: f64,
}

impl DegradationModel {
    pub fn new(
        probability: f64,
        onset_min_hours: usize,
        onset_max_hours: usize,
        failure_window_start: f64,
    ) -> Result<Self, DegradationError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(DegradationError::InvalidProbability(probability));
        }
        if onset_min_hours >= onset_max_hours {
            return Err(DegradationError::EmptyOnsetWindow {
                min: onset_min_hours,
                max: onset_max_hours,
            });
        }
        if !(0.0..1.0).contains(&failure_window_start) {
            return Err(DegradationError::InvalidFailureWindow(failure_window_start));
        }
        Ok(Self {
            probability,
            onset_min_hours,
            onset_max_hours,
            failure_window_start,
        })
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self, DegradationError> {
        Self::new(
            config.degradation_probability,
            config.onset_min_hours,
            config.onset_max_hours,
            config.failure_window_start,
        )
    }

    /// Draw one pattern of `total_hours` values.
    ///
    /// Failure hour is uniform in `[floor(w * total_hours), total_hours)`;
    /// the ramp starts uniformly `[onset_min, onset_max)` hours earlier,
    /// clamped at hour 0.
    pub fn generate_pattern<R: Rng + ?Sized>(
        &self,
        total_hours: usize,
        rng: &mut R,
    ) -> Result<DegradationPattern, DegradationError> {
        if total_hours == 0 {
            return Err(DegradationError::NoHours);
        }

        let will_fail = rng.gen::<f64>() < self.probability;
        if !will_fail {
            return Ok(DegradationPattern::healthy(total_hours));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let earliest = ((total_hours as f64) * self.failure_window_start).floor() as usize;
        let failure_hour = rng.gen_range(earliest.min(total_hours - 1)..total_hours);
        let ramp = rng.gen_range(self.onset_min_hours..self.onset_max_hours);
        let onset_hour = failure_hour.saturating_sub(ramp);

        Ok(DegradationPattern::with_episode(
            total_hours,
            onset_hour,
            failure_hour,
        ))
    }
}

impl Default for DegradationModel {
    fn default() -> Self {
        let g = GenerationConfig::default();
        Self {
            probability: g.degradation_probability,
            onset_min_hours: g.onset_min_hours,
            onset_max_hours: g.onset_max_hours,
            failure_window_start: g.failure_window_start,
        }
    }
}
