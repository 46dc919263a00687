//! Core configuration for fxseq-animation-core.

use serde::{Deserialize, Serialize};

/// Configuration for scheduler sizing and unit conversion.
/// Keep this minimal; expand as needed without breaking API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Size of one grid unit in target units (pixels). Animations that request
    /// `grid_units` have their values multiplied by this.
    pub grid_size: f64,

    /// Initial capacity hints for the active batch list and the value registry.
    pub batch_capacity: usize,
    pub registry_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid_size: 100.0,
            batch_capacity: 64,
            registry_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "grid_size": 50.0 }"#).unwrap();
        assert_eq!(cfg.grid_size, 50.0);
        assert_eq!(cfg.batch_capacity, Config::default().batch_capacity);
    }
}
