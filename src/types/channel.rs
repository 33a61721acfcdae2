//! Sensor channel catalogue
//!
//! The canonical 16-channel schema produced by the telemetry generator. Every
//! downstream stage addresses channels through [`SensorChannel`] rather than
//! through free-form column names, so the schema is checked at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One physical measurement channel on a piece of grid equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorChannel {
    /// Top-oil / winding hot-spot temperature (°C)
    TemperatureTop,
    /// Bulk oil temperature (°C)
    TemperatureOil,
    /// Phase A voltage (V)
    VoltagePhaseA,
    /// Phase B voltage (V)
    VoltagePhaseB,
    /// Phase C voltage (V)
    VoltagePhaseC,
    /// Phase A current (A)
    CurrentPhaseA,
    /// Phase B current (A)
    CurrentPhaseB,
    /// Phase C current (A)
    CurrentPhaseC,
    /// Dissolved hydrogen (ppm)
    GasH2,
    /// Dissolved methane (ppm)
    GasCh4,
    /// Dissolved acetylene (ppm) - arcing indicator
    GasC2h2,
    /// Vibration, horizontal X axis (mm/s)
    VibrationX,
    /// Vibration, horizontal Y axis (mm/s)
    VibrationY,
    /// Vibration, vertical Z axis (mm/s)
    VibrationZ,
    /// Relative humidity inside the enclosure (%)
    Humidity,
    /// Load as a percentage of rated capacity (%)
    LoadPercentage,
}

impl SensorChannel {
    /// Number of channels in the canonical schema.
    pub const COUNT: usize = 16;

    /// All channels in canonical column order.
    pub const ALL: [SensorChannel; Self::COUNT] = [
        SensorChannel::TemperatureTop,
        SensorChannel::TemperatureOil,
        SensorChannel::VoltagePhaseA,
        SensorChannel::VoltagePhaseB,
        SensorChannel::VoltagePhaseC,
        SensorChannel::CurrentPhaseA,
        SensorChannel::CurrentPhaseB,
        SensorChannel::CurrentPhaseC,
        SensorChannel::GasH2,
        SensorChannel::GasCh4,
        SensorChannel::GasC2h2,
        SensorChannel::VibrationX,
        SensorChannel::VibrationY,
        SensorChannel::VibrationZ,
        SensorChannel::Humidity,
        SensorChannel::LoadPercentage,
    ];

    /// Position of this channel in [`SensorChannel::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Canonical column name.
    pub const fn name(self) -> &'static str {
        match self {
            SensorChannel::TemperatureTop => "temperature_top",
            SensorChannel::TemperatureOil => "temperature_oil",
            SensorChannel::VoltagePhaseA => "voltage_phase_a",
            SensorChannel::VoltagePhaseB => "voltage_phase_b",
            SensorChannel::VoltagePhaseC => "voltage_phase_c",
            SensorChannel::CurrentPhaseA => "current_phase_a",
            SensorChannel::CurrentPhaseB => "current_phase_b",
            SensorChannel::CurrentPhaseC => "current_phase_c",
            SensorChannel::GasH2 => "gas_h2",
            SensorChannel::GasCh4 => "gas_ch4",
            SensorChannel::GasC2h2 => "gas_c2h2",
            SensorChannel::VibrationX => "vibration_x",
            SensorChannel::VibrationY => "vibration_y",
            SensorChannel::VibrationZ => "vibration_z",
            SensorChannel::Humidity => "humidity",
            SensorChannel::LoadPercentage => "load_percentage",
        }
    }

    /// Closed physical range `(min, max)` every synthesized value is clipped to.
    pub const fn physical_range(self) -> (f64, f64) {
        match self {
            SensorChannel::TemperatureTop => (20.0, 150.0),
            SensorChannel::TemperatureOil => (20.0, 120.0),
            SensorChannel::VoltagePhaseA
            | SensorChannel::VoltagePhaseB
            | SensorChannel::VoltagePhaseC => (200.0, 250.0),
            SensorChannel::CurrentPhaseA
            | SensorChannel::CurrentPhaseB
            | SensorChannel::CurrentPhaseC => (0.0, 800.0),
            SensorChannel::GasH2 => (0.0, 500.0),
            SensorChannel::GasCh4 => (0.0, 300.0),
            SensorChannel::GasC2h2 => (0.0, 200.0),
            SensorChannel::VibrationX | SensorChannel::VibrationY | SensorChannel::VibrationZ => {
                (0.0, 20.0)
            }
            SensorChannel::Humidity => (10.0, 95.0),
            SensorChannel::LoadPercentage => (30.0, 100.0),
        }
    }

    /// Clip a value into this channel's physical range.
    pub fn clip(self, value: f64) -> f64 {
        let (lo, hi) = self.physical_range();
        value.clamp(lo, hi)
    }

    /// Whether a reading on this channel can never legitimately be negative.
    ///
    /// All channels in this schema are magnitudes; kept as a method so the
    /// preprocessor does not hardcode the list.
    pub const fn requires_non_negative(self) -> bool {
        true
    }
}

impl fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a column name is not a known sensor channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sensor channel '{0}'")]
pub struct UnknownChannel(pub String);

impl FromStr for SensorChannel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorChannel::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}
