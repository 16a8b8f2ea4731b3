//! `--config` file format.
//!
//! ```json
//! {
//!   "transport": { "url": "wss://access.example.org/v1/ws", "connect_timeout_ms": 5000 },
//!   "subscribe": { "heartbeat_interval": 50, "event_encoding": "verbose" },
//!   "log": { "level": "info", "components": { "chainaccess-ws": "debug" } }
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use chainaccess_observability::LogConfig;
use chainaccess_stream::SubscribeConfig;
use chainaccess_ws::WsTransportConfig;

#[derive(Debug, Default, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub transport: Option<WsTransportConfig>,
    #[serde(default)]
    pub subscribe: SubscribeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AccessConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainaccess_core::Encoding;

    #[test]
    fn sections_are_optional() {
        let cfg: AccessConfig = serde_json::from_str("{}").unwrap();
        assert!(cfg.transport.is_none());
        assert_eq!(cfg.subscribe, SubscribeConfig::default());
        assert_eq!(cfg.log, LogConfig::default());
    }

    #[test]
    fn parses_all_sections() {
        let cfg: AccessConfig = serde_json::from_str(
            r#"{
                "transport": {"url": "ws://localhost:9000", "connect_timeout_ms": 500},
                "subscribe": {"heartbeat_interval": 7, "event_encoding": "verbose",
                              "decode_options": {"allow_unstructured_static_types": false}},
                "log": {"level": "debug", "json": true}
            }"#,
        )
        .unwrap();
        let transport = cfg.transport.unwrap();
        assert_eq!(transport.url, "ws://localhost:9000");
        assert_eq!(transport.connect_timeout_ms, 500);
        assert_eq!(cfg.subscribe.heartbeat_interval, 7);
        assert_eq!(cfg.subscribe.event_encoding, Encoding::Verbose);
        assert!(!cfg.subscribe.decode_options.allow_unstructured_static_types);
        assert!(cfg.log.json);
    }
}
