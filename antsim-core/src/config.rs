use crate::action::DEFAULT_MAX_ACTIONS_PER_DRAIN;
use serde::{Deserialize, Serialize};

/// Simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Ticks between decision passes. The pass hands this to every object
    /// as the time elapsed since it last decided.
    pub decide_every_cycles: u32,
    /// Upper bound on ticks a host runs to catch up in one frame.
    pub max_ticks_per_frame: u32,
    /// Actions one top-level execution may run before its work list is dropped.
    pub max_actions_per_drain: usize,
    /// Compute checksum every N ticks (0 = disabled).
    pub checksum_frequency: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            decide_every_cycles: 3,
            max_ticks_per_frame: 6,
            max_actions_per_drain: DEFAULT_MAX_ACTIONS_PER_DRAIN,
            // Default to a checksum every 60 ticks
            checksum_frequency: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.decide_every_cycles, 3);
        assert_eq!(config.max_ticks_per_frame, 6);
        assert_eq!(config.checksum_frequency, 60);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{"checksum_frequency": 1}"#).unwrap();
        assert_eq!(config.checksum_frequency, 1);
        assert_eq!(config.max_actions_per_drain, DEFAULT_MAX_ACTIONS_PER_DRAIN);
    }
}
