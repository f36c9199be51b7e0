//! Engine configuration
//!
//! Loaded from TOML or assembled through [`crate::PolicyEngineBuilder`]:
//!
//! ```toml
//! short_circuit = false
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Policy engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Stop evaluating a path at its first unmet property.
    ///
    /// Decisions are identical either way. With `false` every property of
    /// a path is evaluated, which makes `explain` traces complete.
    pub short_circuit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            short_circuit: true,
        }
    }
}

impl EngineConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading engine configuration from {:?}", path);
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
