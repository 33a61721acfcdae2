//! Static location reference table
//!
//! One row per equipment unit, keyed by equipment id. Unrelated to the
//! time-series core; consumed only by map views. Substations sit on a jittered
//! grid, equipment shares its substation's position with a tiny offset, and
//! the equipment type follows the intra-substation index.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::defaults;
use crate::seed::{RunSeed, Stream};
use crate::types::EquipmentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentType {
    #[serde(rename = "Power Transformer")]
    PowerTransformer,
    #[serde(rename = "Distribution Transformer")]
    DistributionTransformer,
    #[serde(rename = "Circuit Breaker")]
    CircuitBreaker,
    #[serde(rename = "Voltage Regulator")]
    VoltageRegulator,
}

impl EquipmentType {
    /// Type by 1-based index within the substation.
    pub const fn for_index(equipment: usize) -> Self {
        match equipment {
            0..=3 => EquipmentType::PowerTransformer,
            4..=6 => EquipmentType::DistributionTransformer,
            7..=8 => EquipmentType::CircuitBreaker,
            _ => EquipmentType::VoltageRegulator,
        }
    }

    /// Rated capacities (MW) a unit of this type is drawn from.
    pub const fn capacity_choices(self) -> &'static [u32] {
        match self {
            EquipmentType::PowerTransformer => &[50, 100, 150, 200],
            EquipmentType::DistributionTransformer => &[10, 25, 50],
            EquipmentType::CircuitBreaker => &[100, 150, 200],
            EquipmentType::VoltageRegulator => &[50, 75, 100],
        }
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EquipmentType::PowerTransformer => "Power Transformer",
            EquipmentType::DistributionTransformer => "Distribution Transformer",
            EquipmentType::CircuitBreaker => "Circuit Breaker",
            EquipmentType::VoltageRegulator => "Voltage Regulator",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentLocation {
    pub equipment_id: EquipmentId,
    pub substation: String,
    pub latitude: f64,
    pub longitude: f64,
    pub equipment_type: EquipmentType,
    pub capacity_mw: u32,
    pub installation_year: i32,
}

/// Build the reference table for a fleet.
pub fn generate_locations(
    n_substations: usize,
    equipment_per_substation: usize,
    seed: RunSeed,
) -> Vec<EquipmentLocation> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let grid_size = ((n_substations as f64).sqrt() as usize).max(1);
    let mut locations = Vec::with_capacity(n_substations * equipment_per_substation);

    for sub_idx in 0..n_substations {
        let sub = sub_idx + 1;
        let mut rng = seed.rng(Stream::Locations, sub as u64, 0);

        let row = (sub_idx / grid_size) as f64;
        let col = (sub_idx % grid_size) as f64;
        let grid = grid_size as f64;
        let j = defaults::SUBSTATION_JITTER_DEG;
        let sub_lat = (row / grid).mul_add(defaults::GRID_SPAN_LAT, defaults::GRID_ORIGIN_LAT)
            + rng.gen_range(-j..j);
        let sub_lon = (col / grid).mul_add(defaults::GRID_SPAN_LON, defaults::GRID_ORIGIN_LON)
            + rng.gen_range(-j..j);

        for eq in 1..=equipment_per_substation {
            let id = EquipmentId::new(sub, eq);
            let e = defaults::EQUIPMENT_JITTER_DEG;
            let equipment_type = EquipmentType::for_index(eq);
            let capacity_mw = equipment_type
                .capacity_choices()
                .choose(&mut rng)
                .copied()
                .unwrap_or_default();

            locations.push(EquipmentLocation {
                substation: id.substation().to_string(),
                equipment_id: id,
                latitude: sub_lat + rng.gen_range(-e..e),
                longitude: sub_lon + rng.gen_range(-e..e),
                equipment_type,
                capacity_mw,
                installation_year: rng
                    .gen_range(defaults::INSTALL_YEAR_MIN..defaults::INSTALL_YEAR_MAX),
            });
        }
    }

    locations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_follow_index() {
        assert_eq!(EquipmentType::for_index(1), EquipmentType::PowerTransformer);
        assert_eq!(EquipmentType::for_index(5), EquipmentType::DistributionTransformer);
        assert_eq!(EquipmentType::for_index(8), EquipmentType::CircuitBreaker);
        assert_eq!(EquipmentType::for_index(10), EquipmentType::VoltageRegulator);
    }

    #[test]
    fn test_locations_cover_fleet_deterministically() {
        let a = generate_locations(4, 10, RunSeed::new(1));
        let b = generate_locations(4, 10, RunSeed::new(1));
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
        assert_eq!(a[0].equipment_id.as_str(), "SUB001_EQ01");
        assert_eq!(a[39].substation, "SUB004");
        for loc in &a {
            assert!(loc.equipment_type.capacity_choices().contains(&loc.capacity_mw));
            assert!((1990..2023).contains(&loc.installation_year));
            assert!((39.9..42.1).contains(&loc.latitude), "{}", loc.latitude);
            assert!((-75.1..-71.9).contains(&loc.longitude), "{}", loc.longitude);
        }
    }

    #[test]
    fn test_equipment_clusters_at_substation() {
        let locs = generate_locations(2, 3, RunSeed::new(9));
        let spread = (locs[0].latitude - locs[2].latitude).abs();
        assert!(spread <= 0.002);
    }
}
