//! Equipment identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque key for one equipment unit, e.g. `SUB003_EQ07`.
///
/// Unique across a dataset and the grouping key for every per-entity
/// computation (degradation state, rolling/lag features, statistics).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquipmentId(String);

impl EquipmentId {
    /// Build the canonical id from 1-based substation and equipment indices.
    pub fn new(substation: usize, equipment: usize) -> Self {
        Self(format!("SUB{substation:03}_EQ{equipment:02}"))
    }

    /// Wrap an id read from an external table.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substation prefix (`SUB003` for `SUB003_EQ07`), or the whole id when
    /// it does not follow the canonical pattern.
    pub fn substation(&self) -> &str {
        self.0.split_once('_').map_or(self.0.as_str(), |(sub, _)| sub)
    }

    /// 1-based intra-substation index, when the id is canonical.
    pub fn equipment_index(&self) -> Option<usize> {
        self.0
            .split_once("_EQ")
            .and_then(|(_, idx)| idx.parse().ok())
    }
}

impl fmt::Display for EquipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EquipmentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_format() {
        let id = EquipmentId::new(3, 7);
        assert_eq!(id.as_str(), "SUB003_EQ07");
        assert_eq!(id.substation(), "SUB003");
        assert_eq!(id.equipment_index(), Some(7));
    }

    #[test]
    fn test_non_canonical_id() {
        let id = EquipmentId::from_raw("TRANSFORMER-A");
        assert_eq!(id.substation(), "TRANSFORMER-A");
        assert_eq!(id.equipment_index(), None);
    }
}
