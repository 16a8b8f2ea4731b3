use serde::{Deserialize, Serialize};

fn default_connect_timeout_ms() -> u64 {
    10_000
}

/// Connection settings for [`WsTransport`](crate::WsTransport).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsTransportConfig {
    /// `ws://` or `wss://` endpoint of the access node's streaming API.
    pub url: String,
    /// Upper bound for connecting and receiving the subscription ack.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl WsTransportConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }

    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }
}
