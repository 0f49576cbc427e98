//! Scenario file support for the GBN CLI
//!
//! A scenario is a TOML description of one run: the data to transfer,
//! window and sequence-space sizes, loss slots, and timing. Values omitted
//! from the file fall back to the reference defaults.

use gbn_protocol::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Scenario file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Sender window size (N).
    #[serde(default = "default_window")]
    pub window_size: u64,
    /// Sequence-number space size (K).
    #[serde(default = "default_seq_space")]
    pub sequence_space: u64,
    /// Payload symbols to transfer, one per character.
    pub data: String,
    /// Slots dropped exactly once each, data direction.
    #[serde(default)]
    pub packet_loss: Vec<u64>,
    /// Slots dropped exactly once each, acknowledgment direction.
    #[serde(default)]
    pub ack_loss: Vec<u64>,
    /// Per-delivery propagation delay in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub propagation_delay_ms: u64,
    /// Retransmission timer interval in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub retransmission_timeout_ms: u64,
    /// Reserved; accepted but unused by the current logic.
    #[serde(default)]
    pub corrupted_packets: Vec<u64>,
}

fn default_window() -> u64 {
    4
}

fn default_seq_space() -> u64 {
    8
}

fn default_delay_ms() -> u64 {
    500
}

fn default_timeout_ms() -> u64 {
    2000
}

impl Scenario {
    /// Load a scenario from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let contents = fs::read_to_string(path)?;
        let scenario: Scenario = toml::from_str(&contents)?;
        Ok(scenario)
    }

    /// Save a scenario to a TOML file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ScenarioError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// The reference default scenario: "ABCDEF" with data packet 2
    /// dropped once.
    pub fn example() -> Self {
        Scenario {
            window_size: 4,
            sequence_space: 8,
            data: "ABCDEF".to_string(),
            packet_loss: vec![2],
            ack_loss: Vec::new(),
            propagation_delay_ms: 500,
            retransmission_timeout_ms: 2000,
            corrupted_packets: Vec::new(),
        }
    }

    /// Convert into the protocol-level configuration. Validation happens
    /// when the simulation is constructed.
    pub fn to_simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            window_size: self.window_size,
            seq_space: self.sequence_space,
            data: self.data.chars().collect(),
            packet_loss: self.packet_loss.iter().copied().collect(),
            ack_loss: self.ack_loss.iter().copied().collect(),
            propagation_delay: Duration::from_millis(self.propagation_delay_ms),
            retransmission_timeout: Duration::from_millis(self.retransmission_timeout_ms),
            corrupted_packets: self.corrupted_packets.clone(),
        }
    }
}

/// Scenario file errors
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_converts_cleanly() {
        let config = Scenario::example().to_simulation_config();
        assert_eq!(config.window_size, 4);
        assert_eq!(config.seq_space, 8);
        assert_eq!(config.data, "ABCDEF".chars().collect::<Vec<_>>());
        assert!(config.packet_loss.contains(&2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_fill_omitted_fields() {
        let scenario: Scenario = toml::from_str(r#"data = "AB""#).unwrap();
        assert_eq!(scenario.window_size, 4);
        assert_eq!(scenario.sequence_space, 8);
        assert_eq!(scenario.propagation_delay_ms, 500);
        assert_eq!(scenario.retransmission_timeout_ms, 2000);
        assert!(scenario.packet_loss.is_empty());
    }

    #[test]
    fn test_serialize_deserialize() {
        let scenario = Scenario::example();
        let toml = toml::to_string(&scenario).unwrap();
        let parsed: Scenario = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.data, scenario.data);
        assert_eq!(parsed.packet_loss, scenario.packet_loss);
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("gbn-scenario-{}.toml", std::process::id()));
        let scenario = Scenario::example();

        scenario.to_file(&path).unwrap();
        let loaded = Scenario::from_file(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.data, scenario.data);
        assert_eq!(loaded.window_size, scenario.window_size);
        assert_eq!(loaded.sequence_space, scenario.sequence_space);
        assert_eq!(loaded.packet_loss, scenario.packet_loss);
        assert_eq!(loaded.propagation_delay_ms, scenario.propagation_delay_ms);
    }
}
