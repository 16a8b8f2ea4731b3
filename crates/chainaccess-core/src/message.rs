//! Wire-level stream messages.
//!
//! These mirror the server's response units one-to-one. Identifiers and
//! addresses stay raw bytes here (hex on the wire); mapping them into typed
//! records, and decoding embedded payloads, is the message converter's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The resource kinds that can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Blocks,
    BlockHeaders,
    BlockDigests,
    Events,
    ExecutionData,
    AccountStatuses,
}

impl StreamKind {
    pub const ALL: [StreamKind; 6] = [
        StreamKind::Blocks,
        StreamKind::BlockHeaders,
        StreamKind::BlockDigests,
        StreamKind::Events,
        StreamKind::ExecutionData,
        StreamKind::AccountStatuses,
    ];

    /// Topic name used when opening the stream.
    pub fn topic(&self) -> &'static str {
        match self {
            StreamKind::Blocks => "blocks",
            StreamKind::BlockHeaders => "block_headers",
            StreamKind::BlockDigests => "block_digests",
            StreamKind::Events => "events",
            StreamKind::ExecutionData => "execution_data",
            StreamKind::AccountStatuses => "account_statuses",
        }
    }

    /// Human-readable label used in logs and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            StreamKind::Blocks => "block",
            StreamKind::BlockHeaders => "block header",
            StreamKind::BlockDigests => "block digest",
            StreamKind::Events => "events",
            StreamKind::ExecutionData => "execution data",
            StreamKind::AccountStatuses => "account statuses",
        }
    }

    /// Whether messages of this kind carry a monotonic message index.
    pub fn is_sequenced(&self) -> bool {
        matches!(self, StreamKind::AccountStatuses)
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.topic())
    }
}

/// Hex (de)serialization for a single byte string. Accepts an optional `0x`.
pub mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(de::Error::custom)
    }
}

/// Hex (de)serialization for a list of byte strings.
pub mod hex_bytes_vec {
    use serde::{de, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&hex::encode(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        let items = Vec::<String>::deserialize(deserializer)?;
        items
            .iter()
            .map(|s| hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(de::Error::custom))
            .collect()
    }
}

// ─── Blocks ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireBlockHeader {
    #[serde(with = "hex_bytes")]
    pub id: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub parent_id: Vec<u8>,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireCollectionGuarantee {
    #[serde(with = "hex_bytes")]
    pub collection_id: Vec<u8>,
    #[serde(with = "hex_bytes", default)]
    pub signer_indices: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireBlockSeal {
    #[serde(with = "hex_bytes")]
    pub block_id: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub execution_receipt_id: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireBlock {
    #[serde(with = "hex_bytes")]
    pub id: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub parent_id: Vec<u8>,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub collection_guarantees: Vec<WireCollectionGuarantee>,
    #[serde(default)]
    pub block_seals: Vec<WireBlockSeal>,
}

/// One message of the blocks stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockMessage {
    pub block: Option<WireBlock>,
}

/// One message of the block headers stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeaderMessage {
    pub header: Option<WireBlockHeader>,
}

/// One message of the block digests stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDigestMessage {
    #[serde(with = "hex_bytes")]
    pub block_id: Vec<u8>,
    pub block_height: u64,
    pub block_timestamp: DateTime<Utc>,
}

// ─── Events ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(with = "hex_bytes")]
    pub transaction_id: Vec<u8>,
    pub transaction_index: u32,
    pub event_index: u32,
    /// Encoded event value (Compact or Verbose).
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

/// One message of the events stream: all matching events of one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsMessage {
    #[serde(with = "hex_bytes")]
    pub block_id: Vec<u8>,
    pub block_height: u64,
    pub block_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub events: Vec<WireEvent>,
}

// ─── Execution data ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTransaction {
    #[serde(with = "hex_bytes")]
    pub script: Vec<u8>,
    #[serde(with = "hex_bytes_vec", default)]
    pub arguments: Vec<Vec<u8>>,
    #[serde(with = "hex_bytes")]
    pub reference_block_id: Vec<u8>,
    pub gas_limit: u64,
    #[serde(with = "hex_bytes")]
    pub payer: Vec<u8>,
    #[serde(with = "hex_bytes_vec", default)]
    pub authorizers: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireKeyPart {
    #[serde(rename = "type")]
    pub part_type: u16,
    #[serde(with = "hex_bytes")]
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePayload {
    #[serde(default)]
    pub key_parts: Vec<WireKeyPart>,
    #[serde(with = "hex_bytes")]
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTrieUpdate {
    #[serde(with = "hex_bytes")]
    pub root_hash: Vec<u8>,
    #[serde(with = "hex_bytes_vec", default)]
    pub paths: Vec<Vec<u8>>,
    #[serde(default)]
    pub payloads: Vec<WirePayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTransactionResult {
    #[serde(with = "hex_bytes")]
    pub transaction_id: Vec<u8>,
    pub failed: bool,
    pub computation_used: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireChunkExecutionData {
    #[serde(default)]
    pub transactions: Vec<WireTransaction>,
    #[serde(default)]
    pub events: Vec<WireEvent>,
    #[serde(default)]
    pub trie_update: Option<WireTrieUpdate>,
    #[serde(default)]
    pub transaction_results: Vec<WireTransactionResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireBlockExecutionData {
    #[serde(with = "hex_bytes")]
    pub block_id: Vec<u8>,
    #[serde(default)]
    pub chunk_execution_data: Vec<WireChunkExecutionData>,
}

/// One message of the execution data stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionDataMessage {
    pub block_height: u64,
    pub block_timestamp: DateTime<Utc>,
    pub block_execution_data: Option<WireBlockExecutionData>,
}

// ─── Account statuses ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireAccountStatusResult {
    #[serde(with = "hex_bytes")]
    pub address: Vec<u8>,
    #[serde(default)]
    pub events: Vec<WireEvent>,
}

/// One message of the account statuses stream.
///
/// `message_index` increments by exactly one per message, starting at the
/// subscription's starting index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountStatusesMessage {
    #[serde(with = "hex_bytes")]
    pub block_id: Vec<u8>,
    pub block_height: u64,
    pub message_index: u64,
    #[serde(default)]
    pub results: Vec<WireAccountStatusResult>,
}
