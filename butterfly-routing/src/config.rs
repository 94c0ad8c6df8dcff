//! Contraction parameters

use std::path::Path;

use butterfly_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tuning knobs for [`HierarchyBuilder`](crate::HierarchyBuilder).
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// difference_factor = 4.0
/// witness_max_settled = 500
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChConfig {
    /// Weight of (shortcuts added - edges removed)
    pub difference_factor: f32,
    /// Weight of the hierarchy depth estimate
    pub depth_factor: f32,
    /// Weight of the number of already contracted neighbours
    pub contracted_factor: f32,
    /// Settled-vertex budget of one witness search
    pub witness_max_settled: usize,
    /// Optional absolute weight ceiling for witness searches
    pub witness_max_weight: Option<f32>,
    /// Size of the lazy-update miss window
    pub miss_window: usize,
    /// Forward/backward weight tolerance when merging parallel edges
    pub merge_epsilon: f32,
    /// Compute initial and full-recalculation priorities on the rayon pool
    pub parallel_priorities: bool,
}

impl Default for ChConfig {
    fn default() -> Self {
        Self {
            difference_factor: 5.0,
            depth_factor: 5.0,
            contracted_factor: 8.0,
            witness_max_settled: 250,
            witness_max_weight: None,
            miss_window: 20,
            merge_epsilon: 0.0,
            parallel_priorities: true,
        }
    }
}

impl ChConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let factors = [
            ("difference_factor", self.difference_factor),
            ("depth_factor", self.depth_factor),
            ("contracted_factor", self.contracted_factor),
            ("merge_epsilon", self.merge_epsilon),
        ];
        for (name, value) in factors {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if let Some(w) = self.witness_max_weight {
            if w.is_nan() || w <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "witness_max_weight must be positive, got {w}"
                )));
            }
        }
        if self.witness_max_settled == 0 {
            return Err(Error::InvalidConfig(
                "witness_max_settled must be at least 1".into(),
            ));
        }
        if self.miss_window == 0 {
            return Err(Error::InvalidConfig("miss_window must be at least 1".into()));
        }
        Ok(())
    }
}
