//! Per-subscription options.

use serde::{Deserialize, Serialize};

use chainaccess_codec::DecodeOptions;
use chainaccess_core::value::Encoding;
use chainaccess_core::RequestError;

/// Options applied to every subscription opened by an
/// [`AccessClient`](crate::AccessClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeConfig {
    /// Blocks between heartbeat messages the server sends when nothing
    /// matches the filter. Must be non-zero.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: u64,
    /// First expected message index of the account statuses stream.
    #[serde(default)]
    pub starting_message_index: u64,
    /// Payload encoding requested from the server. Decoding still sniffs
    /// every payload, so mixed streams are handled either way.
    #[serde(default)]
    pub event_encoding: Encoding,
    /// Passed unchanged to every payload decode of the subscription.
    #[serde(default)]
    pub decode_options: DecodeOptions,
}

fn default_heartbeat_interval() -> u64 {
    100
}

impl Default for SubscribeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: default_heartbeat_interval(),
            starting_message_index: 0,
            event_encoding: Encoding::default(),
            decode_options: DecodeOptions::default(),
        }
    }
}

impl SubscribeConfig {
    pub fn with_heartbeat_interval(mut self, blocks: u64) -> Self {
        self.heartbeat_interval = blocks;
        self
    }

    pub fn with_starting_message_index(mut self, index: u64) -> Self {
        self.starting_message_index = index;
        self
    }

    pub fn with_event_encoding(mut self, encoding: Encoding) -> Self {
        self.event_encoding = encoding;
        self
    }

    pub fn with_decode_options(mut self, options: DecodeOptions) -> Self {
        self.decode_options = options;
        self
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.heartbeat_interval == 0 {
            return Err(RequestError::InvalidHeartbeat);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_json() {
        let cfg: SubscribeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, SubscribeConfig::default());
        assert_eq!(cfg.heartbeat_interval, 100);
        assert!(cfg.decode_options.allow_unstructured_static_types);
    }

    #[test]
    fn zero_heartbeat_is_rejected() {
        let cfg = SubscribeConfig::default().with_heartbeat_interval(0);
        assert_eq!(cfg.validate(), Err(RequestError::InvalidHeartbeat));
    }
}
