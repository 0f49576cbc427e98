//! Simulation configuration
//!
//! One immutable value describing a whole run, handed by construction to
//! every component. Validation happens up front; no protocol state is built
//! from a configuration that fails it.

use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Default sequence-number space size (`K`).
pub const DEFAULT_SEQ_SPACE: u64 = 8;

/// Default retransmission timer interval.
pub const DEFAULT_RETRANSMISSION_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("window size must be at least 1")]
    ZeroWindow,

    #[error("sequence space must hold at least 2 slots, got {0}")]
    SequenceSpaceTooSmall(u64),

    #[error("window size {window} must be smaller than sequence space {seq_space}")]
    WindowTooLarge { window: u64, seq_space: u64 },

    #[error("retransmission timeout must be non-zero")]
    ZeroTimeout,

    #[error("{direction} loss slot {slot} is outside sequence space {seq_space}")]
    LossSlotOutOfRange {
        direction: &'static str,
        slot: u64,
        seq_space: u64,
    },
}

/// Full configuration for one simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Sender window size (`N`).
    pub window_size: u64,
    /// Sequence-number space size (`K`).
    pub seq_space: u64,
    /// Ordered payload symbols to transfer.
    pub data: Vec<char>,
    /// Slots dropped exactly once each on the data direction.
    pub packet_loss: HashSet<u64>,
    /// Slots dropped exactly once each on the acknowledgment direction.
    pub ack_loss: HashSet<u64>,
    /// Propagation delay applied per delivery, both directions.
    pub propagation_delay: Duration,
    /// Fixed retransmission timer interval (not adaptive).
    pub retransmission_timeout: Duration,
    /// Accepted but unused by the current logic; reserved for a corruption
    /// fault model.
    pub corrupted_packets: Vec<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            window_size: 4,
            seq_space: DEFAULT_SEQ_SPACE,
            data: Vec::new(),
            packet_loss: HashSet::new(),
            ack_loss: HashSet::new(),
            propagation_delay: Duration::from_millis(500),
            retransmission_timeout: DEFAULT_RETRANSMISSION_TIMEOUT,
            corrupted_packets: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Create a configuration with the given data and defaults elsewhere.
    pub fn new(data: impl IntoIterator<Item = char>) -> Self {
        SimulationConfig {
            data: data.into_iter().collect(),
            ..SimulationConfig::default()
        }
    }

    /// Check the configuration for protocol-breaking values.
    ///
    /// `window_size >= seq_space` is rejected outright: with `N >= K` the
    /// cumulative acknowledgment cannot distinguish a wrapped old window
    /// from new data, which silently corrupts window advancement.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.seq_space < 2 {
            return Err(ConfigError::SequenceSpaceTooSmall(self.seq_space));
        }
        if self.window_size >= self.seq_space {
            return Err(ConfigError::WindowTooLarge {
                window: self.window_size,
                seq_space: self.seq_space,
            });
        }
        if self.retransmission_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        for &slot in &self.packet_loss {
            if slot >= self.seq_space {
                return Err(ConfigError::LossSlotOutOfRange {
                    direction: "data",
                    slot,
                    seq_space: self.seq_space,
                });
            }
        }
        for &slot in &self.ack_loss {
            if slot >= self.seq_space {
                return Err(ConfigError::LossSlotOutOfRange {
                    direction: "ack",
                    slot,
                    seq_space: self.seq_space,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> SimulationConfig {
        SimulationConfig::new("ABCDEF".chars())
    }

    #[test]
    fn test_default_is_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = base_config();
        config.window_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroWindow));
    }

    #[test]
    fn test_window_must_stay_below_seq_space() {
        let mut config = base_config();
        config.window_size = 8;
        config.seq_space = 8;
        assert_eq!(
            config.validate(),
            Err(ConfigError::WindowTooLarge {
                window: 8,
                seq_space: 8
            })
        );
    }

    #[test]
    fn test_tiny_sequence_space_rejected() {
        let mut config = base_config();
        config.window_size = 1;
        config.seq_space = 1;
        assert_eq!(
            config.validate(),
            Err(ConfigError::SequenceSpaceTooSmall(1))
        );
    }

    #[test]
    fn test_loss_slot_out_of_range() {
        let mut config = base_config();
        config.packet_loss.insert(9);
        assert_eq!(
            config.validate(),
            Err(ConfigError::LossSlotOutOfRange {
                direction: "data",
                slot: 9,
                seq_space: 8
            })
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = base_config();
        config.retransmission_timeout = Duration::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }
}
