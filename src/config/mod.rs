//! Guardian Configuration Module
//!
//! All generation, labeling and feature parameters loaded from TOML, replacing
//! hardcoded thresholds with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `GRID_GUARDIAN_CONFIG` environment variable (path to TOML file)
//! 2. `grid_guardian.toml` in the current working directory
//! 3. Built-in defaults (matching the reference demonstrator)
//!
//! The loaded config is passed explicitly to every component; there is no
//! process-wide instance.
//!
//! ```ignore
//! let config = GuardianConfig::load()?;
//! let labeler = RiskLabeler::new(&config);
//! ```

mod guardian_config;
pub mod defaults;
pub mod validation;

pub use guardian_config::*;
