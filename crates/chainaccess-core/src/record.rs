//! Domain records delivered to subscribers, one per received message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Address, Identifier};
use crate::value::Value;

/// Event type emitted when a new account is created.
pub const EVENT_ACCOUNT_CREATED: &str = "flow.AccountCreated";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub id: Identifier,
    pub parent_id: Identifier,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionGuarantee {
    pub collection_id: Identifier,
    pub signer_indices: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSeal {
    pub block_id: Identifier,
    pub execution_receipt_id: Identifier,
}

/// A full block: header plus payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub collection_guarantees: Vec<CollectionGuarantee>,
    pub seals: Vec<BlockSeal>,
}

impl Block {
    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn id(&self) -> Identifier {
        self.header.id
    }
}

/// The lightweight summary emitted by the block digests stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDigest {
    pub block_id: Identifier,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
}

/// A decoded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Qualified event type, e.g. `A.0000000000000001.Token.Deposited`.
    pub event_type: String,
    pub transaction_id: Identifier,
    /// Index of the emitting transaction within its block.
    pub transaction_index: u32,
    /// Index of the event within its transaction.
    pub event_index: u32,
    /// The decoded event value.
    pub value: Value,
    /// The encoded payload the value was decoded from.
    #[serde(skip)]
    pub payload: Vec<u8>,
}

/// All events of one block matching a subscription filter.
///
/// Heartbeat messages produce a `BlockEvents` with no events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEvents {
    pub block_id: Identifier,
    pub height: u64,
    pub block_timestamp: DateTime<Utc>,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub script: Vec<u8>,
    /// Encoded arguments, kept as received.
    pub arguments: Vec<Vec<u8>>,
    pub reference_block_id: Identifier,
    pub gas_limit: u64,
    pub payer: Address,
    pub authorizers: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPart {
    pub part_type: u16,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub key_parts: Vec<KeyPart>,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieUpdate {
    pub root_hash: Vec<u8>,
    pub paths: Vec<Vec<u8>>,
    pub payloads: Vec<Payload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightTransactionResult {
    pub transaction_id: Identifier,
    pub failed: bool,
    pub computation_used: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkExecutionData {
    pub transactions: Vec<Transaction>,
    pub events: Vec<Event>,
    pub trie_update: Option<TrieUpdate>,
    pub transaction_results: Vec<LightTransactionResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionData {
    pub block_id: Identifier,
    pub chunks: Vec<ChunkExecutionData>,
}

/// One record of the execution data stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionDataStreamResponse {
    pub height: u64,
    pub execution_data: ExecutionData,
    pub block_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatusResult {
    pub address: Address,
    pub events: Vec<Event>,
}

/// One record of the account statuses stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatus {
    pub block_id: Identifier,
    pub block_height: u64,
    pub message_index: u64,
    pub results: Vec<AccountStatusResult>,
}

impl AccountStatus {
    /// Iterate over every event of every account in this record.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.results.iter().flat_map(|r| r.events.iter())
    }
}
