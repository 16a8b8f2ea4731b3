//! Subscribe requests: start selectors, filters and per-kind request bodies.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::types::{Address, Identifier};
use crate::value::Encoding;

/// Where a subscription starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartSelector {
    BlockId(Identifier),
    Height(u64),
    Latest,
}

/// Loosely specified start point, e.g. as collected from flags or a config
/// file. Exactly one of the three must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOptions {
    #[serde(default)]
    pub block_id: Option<Identifier>,
    #[serde(default)]
    pub height: Option<u64>,
    #[serde(default)]
    pub latest: bool,
}

impl StartOptions {
    /// Resolve into a single [`StartSelector`].
    pub fn validate(&self) -> Result<StartSelector, RequestError> {
        match (self.block_id, self.height, self.latest) {
            (Some(id), None, false) => Ok(StartSelector::BlockId(id)),
            (None, Some(h), false) => Ok(StartSelector::Height(h)),
            (None, None, true) => Ok(StartSelector::Latest),
            (None, None, false) => Err(RequestError::MissingStart),
            _ => {
                let mut chosen = Vec::new();
                if self.block_id.is_some() {
                    chosen.push("block_id");
                }
                if self.height.is_some() {
                    chosen.push("height");
                }
                if self.latest {
                    chosen.push("latest");
                }
                Err(RequestError::ConflictingStart(chosen.join(", ")))
            }
        }
    }
}

impl From<StartSelector> for StartOptions {
    fn from(selector: StartSelector) -> Self {
        match selector {
            StartSelector::BlockId(id) => Self {
                block_id: Some(id),
                ..Self::default()
            },
            StartSelector::Height(h) => Self {
                height: Some(h),
                ..Self::default()
            },
            StartSelector::Latest => Self {
                latest: true,
                ..Self::default()
            },
        }
    }
}

/// Which block status a blocks / headers / digests subscription follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    #[default]
    Finalized,
    Sealed,
}

impl std::str::FromStr for BlockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finalized" => Ok(Self::Finalized),
            "sealed" => Ok(Self::Sealed),
            other => Err(format!("unknown block status '{other}'")),
        }
    }
}

/// Server-side event filter. Empty lists match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contracts: Vec<String>,
}

impl EventFilter {
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types.push(event_type.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.addresses.push(address.into());
        self
    }

    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contracts.push(contract.into());
        self
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        for t in &self.event_types {
            validate_event_type(t)?;
        }
        for a in &self.addresses {
            a.parse::<Address>()?;
        }
        for c in &self.contracts {
            validate_contract(c)?;
        }
        Ok(())
    }
}

/// Filter for the account statuses stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatusFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
}

impl AccountStatusFilter {
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types.push(event_type.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.addresses.push(address.into());
        self
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        for t in &self.event_types {
            validate_event_type(t)?;
        }
        for a in &self.addresses {
            a.parse::<Address>()?;
        }
        Ok(())
    }
}

/// Accepts `flow.<Name>` and `A.<16 hex>.<Contract>.<Name>`.
pub fn validate_event_type(value: &str) -> Result<(), RequestError> {
    let invalid = |reason: &str| RequestError::InvalidEventType {
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let parts: Vec<&str> = value.split('.').collect();
    match parts.as_slice() {
        ["flow", name] if is_identifier(name) => Ok(()),
        ["flow", _] => Err(invalid("bad event name")),
        ["A", addr, contract, name] => {
            if !is_hex_address(addr) {
                return Err(invalid("address must be 16 hex characters"));
            }
            if !is_identifier(contract) || !is_identifier(name) {
                return Err(invalid("bad contract or event name"));
            }
            Ok(())
        }
        _ => Err(invalid(
            "expected 'flow.<Name>' or 'A.<address>.<Contract>.<Name>'",
        )),
    }
}

/// Accepts `A.<16 hex>.<Contract>`.
pub fn validate_contract(value: &str) -> Result<(), RequestError> {
    let invalid = |reason: &str| RequestError::InvalidContract {
        value: value.to_string(),
        reason: reason.to_string(),
    };
    match value.split('.').collect::<Vec<_>>().as_slice() {
        ["A", addr, contract] if is_hex_address(addr) && is_identifier(contract) => Ok(()),
        ["A", _, _] => Err(invalid("bad address or contract name")),
        _ => Err(invalid("expected 'A.<address>.<Contract>'")),
    }
}

fn is_hex_address(s: &str) -> bool {
    s.len() == Address::LEN * 2 && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Fields common to every subscribe request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_block_id: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_block_height: Option<u64>,
    pub heartbeat_interval: u64,
    pub event_encoding: Encoding,
}

impl StreamRequest {
    pub fn new(start: StartSelector, heartbeat_interval: u64, event_encoding: Encoding) -> Self {
        let (start_block_id, start_block_height) = match start {
            StartSelector::BlockId(id) => (Some(id), None),
            StartSelector::Height(h) => (None, Some(h)),
            StartSelector::Latest => (None, None),
        };
        Self {
            start_block_id,
            start_block_height,
            heartbeat_interval,
            event_encoding,
        }
    }

    /// Both start fields absent means "from latest".
    pub fn start(&self) -> StartSelector {
        match (self.start_block_id, self.start_block_height) {
            (Some(id), _) => StartSelector::BlockId(id),
            (None, Some(h)) => StartSelector::Height(h),
            (None, None) => StartSelector::Latest,
        }
    }
}

/// Request for the blocks, block headers and block digests streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocksRequest {
    #[serde(flatten)]
    pub stream: StreamRequest,
    pub block_status: BlockStatus,
}

pub type BlockHeadersRequest = BlocksRequest;
pub type BlockDigestsRequest = BlocksRequest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsRequest {
    #[serde(flatten)]
    pub stream: StreamRequest,
    pub filter: EventFilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionDataRequest {
    #[serde(flatten)]
    pub stream: StreamRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatusesRequest {
    #[serde(flatten)]
    pub stream: StreamRequest,
    pub filter: AccountStatusFilter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_options_exactly_one() {
        let by_height = StartOptions {
            height: Some(10),
            ..Default::default()
        };
        assert_eq!(by_height.validate().unwrap(), StartSelector::Height(10));

        assert_eq!(
            StartOptions::default().validate().unwrap_err(),
            RequestError::MissingStart
        );

        let conflicting = StartOptions {
            block_id: Some(Identifier([1; 32])),
            height: Some(10),
            latest: false,
        };
        match conflicting.validate().unwrap_err() {
            RequestError::ConflictingStart(which) => assert_eq!(which, "block_id, height"),
            other => panic!("unexpected error: {other:?}"),
        }

        let latest_and_height = StartOptions {
            block_id: None,
            height: Some(1),
            latest: true,
        };
        assert!(latest_and_height.validate().is_err());
    }

    #[test]
    fn selector_round_trips_through_options() {
        for sel in [
            StartSelector::Latest,
            StartSelector::Height(7),
            StartSelector::BlockId(Identifier([9; 32])),
        ] {
            assert_eq!(StartOptions::from(sel).validate().unwrap(), sel);
            assert_eq!(StreamRequest::new(sel, 100, Encoding::Compact).start(), sel);
        }
    }

    #[test]
    fn event_type_validation() {
        assert!(validate_event_type("flow.AccountCreated").is_ok());
        assert!(validate_event_type("A.0000000000000001.Token.Deposited").is_ok());
        assert!(validate_event_type("A.01.Token.Deposited").is_err());
        assert!(validate_event_type("Token.Deposited").is_err());
        assert!(validate_event_type("flow.1bad").is_err());
        assert!(validate_event_type("").is_err());
    }

    #[test]
    fn filter_validation_reports_first_bad_entry() {
        let filter = EventFilter::default()
            .with_event_type("flow.AccountCreated")
            .with_address("0xnothex");
        assert!(matches!(
            filter.validate(),
            Err(RequestError::InvalidAddress { .. })
        ));

        let filter = EventFilter::default().with_contract("A.0000000000000001.Token");
        assert!(filter.validate().is_ok());
        let filter = EventFilter::default().with_contract("Token");
        assert!(matches!(
            filter.validate(),
            Err(RequestError::InvalidContract { .. })
        ));
    }

    #[test]
    fn request_serializes_start_as_optional_fields() {
        let req = EventsRequest {
            stream: StreamRequest::new(StartSelector::Height(5), 10, Encoding::Compact),
            filter: EventFilter::default().with_event_type("flow.AccountCreated"),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["start_block_height"], 5);
        assert!(v.get("start_block_id").is_none());
        assert_eq!(v["heartbeat_interval"], 10);
        assert_eq!(v["event_encoding"], "compact");
        assert_eq!(v["filter"]["event_types"][0], "flow.AccountCreated");
    }
}
