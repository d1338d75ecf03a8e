//! Relay core configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::application::DEFAULT_OUTBOX_CAPACITY;

/// Fan-out tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Per-connection queue depth; a full queue drops messages for that
    /// connection only
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

impl RelayConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.outbox_capacity == 0 {
            return Err(ValidationError::InvalidOutboxCapacity);
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

fn default_outbox_capacity() -> usize {
    DEFAULT_OUTBOX_CAPACITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_config_defaults() {
        assert_eq!(RelayConfig::default().outbox_capacity, 128);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = RelayConfig { outbox_capacity: 0 };
        assert_eq!(config.validate(), Err(ValidationError::InvalidOutboxCapacity));
    }
}
