//! Sensor Synthesizer
//!
//! Maps a severity curve and the daily load cycle to the 16 correlated sensor
//! channels. Each physical channel is
//!
//! ```text
//! value = base + load_gain * load + severity_gain * severity + noise
//! ```
//!
//! clipped to the channel's physical range. Temperature and current rise with
//! load and severity, voltage sags with severity, dissolved gases and vibration
//! rise sharply with severity. The three voltage phases share one noise draw
//! per row (common supply-side variation).
//!
//! Noise is drawn from the caller's RNG in a fixed order (load, then channels
//! in canonical order), so identical severity and seed give bit-identical
//! output.

mod load_cycle;

pub use load_cycle::LoadCycle;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::types::SensorChannel;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SynthesisError {
    #[error("shape mismatch: n_rows = {n_rows} but severity has {severity_len} values")]
    ShapeMismatch { n_rows: usize, severity_len: usize },
    #[error("severity at row {row} is {value}, expected a finite value in [0, 1]")]
    InvalidSeverity { row: usize, value: f64 },
    #[error("invalid noise parameter: {0}")]
    Noise(String),
}

impl From<rand_distr::NormalError> for SynthesisError {
    fn from(e: rand_distr::NormalError) -> Self {
        SynthesisError::Noise(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum NoiseSource {
    Independent(f64),
    /// One draw per row shared by every channel with this source
    SharedVoltage(f64),
}

/// Affine response of one channel to load and severity.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ChannelResponse {
    channel: SensorChannel,
    base: f64,
    load_gain: f64,
    severity_gain: f64,
    noise: NoiseSource,
}

const fn response(
    channel: SensorChannel,
    base: f64,
    load_gain: f64,
    severity_gain: f64,
    noise: NoiseSource,
) -> ChannelResponse {
    ChannelResponse {
        channel,
        base,
        load_gain,
        severity_gain,
        noise,
    }
}

/// Every channel except `load_percentage`, in canonical order.
const RESPONSES: [ChannelResponse; 15] = {
    use NoiseSource::{Independent, SharedVoltage};
    use SensorChannel::*;
    [
        response(TemperatureTop, 65.0, 15.0, 30.0, Independent(3.0)),
        response(TemperatureOil, 55.0, 12.0, 25.0, Independent(2.0)),
        response(VoltagePhaseA, 230.0, 0.0, -5.0, SharedVoltage(2.0)),
        response(VoltagePhaseB, 230.0, 0.0, -4.0, SharedVoltage(2.0)),
        response(VoltagePhaseC, 230.0, 0.0, -6.0, SharedVoltage(2.0)),
        response(CurrentPhaseA, 0.0, 400.0, 50.0, Independent(10.0)),
        response(CurrentPhaseB, 0.0, 400.0, 45.0, Independent(10.0)),
        response(CurrentPhaseC, 0.0, 400.0, 55.0, Independent(10.0)),
        response(GasH2, 50.0, 0.0, 200.0, Independent(10.0)),
        response(GasCh4, 30.0, 0.0, 150.0, Independent(8.0)),
        response(GasC2h2, 5.0, 0.0, 100.0, Independent(5.0)),
        response(VibrationX, 2.0, 0.0, 5.0, Independent(0.3)),
        response(VibrationY, 2.0, 0.0, 4.0, Independent(0.3)),
        response(VibrationZ, 2.0, 0.0, 6.0, Independent(0.3)),
        response(Humidity, 45.0, 0.0, 20.0, Independent(5.0)),
    ]
};

/// Synthesized columns for one contiguous series, in canonical channel order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReadings {
    columns: Vec<Vec<f64>>,
}

impl ChannelReadings {
    pub fn channel(&self, channel: SensorChannel) -> &[f64] {
        &self.columns[channel.index()]
    }

    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Vec<f64>> {
        self.columns
    }
}

#[derive(Debug, Clone)]
pub struct SensorSynthesizer {
    load: LoadCycle,
    noise: Vec<Normal<f64>>,
}

impl SensorSynthesizer {
    pub fn new() -> Result<Self, SynthesisError> {
        let noise = RESPONSES
            .iter()
            .map(|r| match r.noise {
                NoiseSource::Independent(std) | NoiseSource::SharedVoltage(std) => {
                    Normal::new(0.0, std)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            load: LoadCycle::new()?,
            noise,
        })
    }

    /// Readings for `n_rows` consecutive hours starting at absolute hour
    /// `first_hour` (which sets the phase of the daily load cycle).
    pub fn generate_readings<R: Rng + ?Sized>(
        &self,
        n_rows: usize,
        first_hour: usize,
        severity: &[f64],
        rng: &mut R,
    ) -> Result<ChannelReadings, SynthesisError> {
        if severity.len() != n_rows {
            return Err(SynthesisError::ShapeMismatch {
                n_rows,
                severity_len: severity.len(),
            });
        }
        if let Some((row, &value)) = severity
            .iter()
            .enumerate()
            .find(|(_, s)| !(0.0..=1.0).contains(*s))
        {
            return Err(SynthesisError::InvalidSeverity { row, value });
        }

        let load = self.load.sample(first_hour, n_rows, rng);
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); SensorChannel::COUNT];
        let mut shared_voltage: Option<Vec<f64>> = None;

        for (response, noise) in RESPONSES.iter().zip(&self.noise) {
            let draws: Vec<f64> = match response.noise {
                NoiseSource::Independent(_) => (0..n_rows).map(|_| noise.sample(rng)).collect(),
                NoiseSource::SharedVoltage(_) => shared_voltage
                    .get_or_insert_with(|| (0..n_rows).map(|_| noise.sample(rng)).collect())
                    .clone(),
            };

            columns[response.channel.index()] = load
                .iter()
                .zip(severity)
                .zip(draws)
                .map(|((&l, &d), n)| {
                    let value = response.severity_gain.mul_add(
                        d,
                        response.load_gain.mul_add(l, response.base),
                    ) + n;
                    response.channel.clip(value)
                })
                .collect();
        }

        columns[SensorChannel::LoadPercentage.index()] = load
            .iter()
            .map(|&l| SensorChannel::LoadPercentage.clip(l * 100.0))
            .collect();

        Ok(ChannelReadings { columns })
    }
}
