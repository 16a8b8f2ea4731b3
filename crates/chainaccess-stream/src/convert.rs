//! Message converters: one wire message in, one domain record out.
//!
//! Conversion is all-or-nothing. The first field that fails to map, or the
//! first payload that fails to decode, fails the whole message; partially
//! converted records are never produced.

use chainaccess_codec::DecodeOptions;
use chainaccess_core::message::{
    AccountStatusesMessage, BlockDigestMessage, BlockHeaderMessage, BlockMessage, EventsMessage,
    ExecutionDataMessage, StreamKind, WireBlockHeader, WireChunkExecutionData, WireEvent,
    WireTransaction, WireTrieUpdate,
};
use chainaccess_core::record::{
    AccountStatus, AccountStatusResult, Block, BlockDigest, BlockEvents, BlockHeader, BlockSeal,
    ChunkExecutionData, CollectionGuarantee, Event, ExecutionData, ExecutionDataStreamResponse,
    KeyPart, LightTransactionResult, Payload, Transaction, TrieUpdate,
};
use chainaccess_core::types::{Address, Identifier};
use chainaccess_core::value::Value;
use chainaccess_core::ConversionError;

/// Maps one kind of wire message into its domain record.
pub trait MessageConverter: Send + 'static {
    type Message: Send + 'static;
    type Record: Send + 'static;

    const KIND: StreamKind;

    fn convert(
        &self,
        msg: Self::Message,
        opts: &DecodeOptions,
    ) -> Result<Self::Record, ConversionError>;

    /// Block height of the message, used as error context.
    fn height(msg: &Self::Message) -> u64;

    /// Sequence index for kinds that carry one.
    fn message_index(_msg: &Self::Message) -> Option<u64> {
        None
    }
}

// ─── Field helpers ────────────────────────────────────────────────────────────

fn identifier(
    entity: &'static str,
    field: &'static str,
    bytes: &[u8],
) -> Result<Identifier, ConversionError> {
    Identifier::from_slice(bytes).ok_or_else(|| ConversionError::InvalidField {
        entity,
        field,
        reason: format!("expected {} bytes, got {}", Identifier::LEN, bytes.len()),
    })
}

fn address(
    entity: &'static str,
    field: &'static str,
    bytes: &[u8],
) -> Result<Address, ConversionError> {
    Address::from_slice(bytes).ok_or_else(|| ConversionError::InvalidField {
        entity,
        field,
        reason: format!("expected {} bytes, got {}", Address::LEN, bytes.len()),
    })
}

/// Decode one event. `location` names its position in the message.
pub fn convert_event(
    ev: WireEvent,
    location: String,
    opts: &DecodeOptions,
) -> Result<Event, ConversionError> {
    let transaction_id = identifier("event", "transaction_id", &ev.transaction_id)?;
    let value = match chainaccess_codec::decode(&ev.payload, opts) {
        Ok(value @ Value::Event(_)) => value,
        Ok(other) => {
            return Err(ConversionError::InvalidField {
                entity: "event",
                field: "payload",
                reason: format!("{location}: expected Event value, got {}", other.type_name()),
            })
        }
        Err(source) => {
            return Err(ConversionError::Payload {
                entity: "event",
                location,
                source,
            })
        }
    };
    Ok(Event {
        event_type: ev.event_type,
        transaction_id,
        transaction_index: ev.transaction_index,
        event_index: ev.event_index,
        value,
        payload: ev.payload,
    })
}

/// Decode a list of events; locations are `<prefix>events[i]`.
fn convert_events(
    events: Vec<WireEvent>,
    prefix: &str,
    opts: &DecodeOptions,
) -> Result<Vec<Event>, ConversionError> {
    events
        .into_iter()
        .enumerate()
        .map(|(i, ev)| convert_event(ev, format!("{prefix}events[{i}]"), opts))
        .collect()
}

fn convert_header(h: WireBlockHeader) -> Result<BlockHeader, ConversionError> {
    Ok(BlockHeader {
        id: identifier("block header", "id", &h.id)?,
        parent_id: identifier("block header", "parent_id", &h.parent_id)?,
        height: h.height,
        timestamp: h.timestamp,
    })
}

// ─── Blocks ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockConverter;

impl MessageConverter for BlockConverter {
    type Message = BlockMessage;
    type Record = Block;
    const KIND: StreamKind = StreamKind::Blocks;

    fn convert(&self, msg: BlockMessage, _opts: &DecodeOptions) -> Result<Block, ConversionError> {
        let b = msg
            .block
            .ok_or(ConversionError::EmptyMessage { entity: "block" })?;
        let header = BlockHeader {
            id: identifier("block", "id", &b.id)?,
            parent_id: identifier("block", "parent_id", &b.parent_id)?,
            height: b.height,
            timestamp: b.timestamp,
        };
        let collection_guarantees = b
            .collection_guarantees
            .into_iter()
            .map(|g| {
                Ok(CollectionGuarantee {
                    collection_id: identifier("collection guarantee", "collection_id", &g.collection_id)?,
                    signer_indices: g.signer_indices,
                })
            })
            .collect::<Result<Vec<_>, ConversionError>>()?;
        let seals = b
            .block_seals
            .into_iter()
            .map(|s| {
                Ok(BlockSeal {
                    block_id: identifier("block seal", "block_id", &s.block_id)?,
                    execution_receipt_id: identifier(
                        "block seal",
                        "execution_receipt_id",
                        &s.execution_receipt_id,
                    )?,
                })
            })
            .collect::<Result<Vec<_>, ConversionError>>()?;
        Ok(Block {
            header,
            collection_guarantees,
            seals,
        })
    }

    fn height(msg: &BlockMessage) -> u64 {
        msg.block.as_ref().map_or(0, |b| b.height)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockHeaderConverter;

impl MessageConverter for BlockHeaderConverter {
    type Message = BlockHeaderMessage;
    type Record = BlockHeader;
    const KIND: StreamKind = StreamKind::BlockHeaders;

    fn convert(
        &self,
        msg: BlockHeaderMessage,
        _opts: &DecodeOptions,
    ) -> Result<BlockHeader, ConversionError> {
        let h = msg.header.ok_or(ConversionError::EmptyMessage {
            entity: "block header",
        })?;
        convert_header(h)
    }

    fn height(msg: &BlockHeaderMessage) -> u64 {
        msg.header.as_ref().map_or(0, |h| h.height)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockDigestConverter;

impl MessageConverter for BlockDigestConverter {
    type Message = BlockDigestMessage;
    type Record = BlockDigest;
    const KIND: StreamKind = StreamKind::BlockDigests;

    fn convert(
        &self,
        msg: BlockDigestMessage,
        _opts: &DecodeOptions,
    ) -> Result<BlockDigest, ConversionError> {
        Ok(BlockDigest {
            block_id: identifier("block digest", "block_id", &msg.block_id)?,
            height: msg.block_height,
            timestamp: msg.block_timestamp,
        })
    }

    fn height(msg: &BlockDigestMessage) -> u64 {
        msg.block_height
    }
}

// ─── Events ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct EventsConverter;

impl MessageConverter for EventsConverter {
    type Message = EventsMessage;
    type Record = BlockEvents;
    const KIND: StreamKind = StreamKind::Events;

    fn convert(
        &self,
        msg: EventsMessage,
        opts: &DecodeOptions,
    ) -> Result<BlockEvents, ConversionError> {
        Ok(BlockEvents {
            block_id: identifier("events", "block_id", &msg.block_id)?,
            height: msg.block_height,
            block_timestamp: msg.block_timestamp,
            events: convert_events(msg.events, "", opts)?,
        })
    }

    fn height(msg: &EventsMessage) -> u64 {
        msg.block_height
    }
}

// ─── Execution data ───────────────────────────────────────────────────────────

fn convert_transaction(tx: WireTransaction) -> Result<Transaction, ConversionError> {
    Ok(Transaction {
        reference_block_id: identifier("transaction", "reference_block_id", &tx.reference_block_id)?,
        payer: address("transaction", "payer", &tx.payer)?,
        authorizers: tx
            .authorizers
            .iter()
            .map(|a| address("transaction", "authorizers", a))
            .collect::<Result<_, _>>()?,
        script: tx.script,
        arguments: tx.arguments,
        gas_limit: tx.gas_limit,
    })
}

fn convert_trie_update(t: WireTrieUpdate) -> TrieUpdate {
    TrieUpdate {
        root_hash: t.root_hash,
        paths: t.paths,
        payloads: t
            .payloads
            .into_iter()
            .map(|p| Payload {
                key_parts: p
                    .key_parts
                    .into_iter()
                    .map(|k| KeyPart {
                        part_type: k.part_type,
                        value: k.value,
                    })
                    .collect(),
                value: p.value,
            })
            .collect(),
    }
}

fn convert_chunk(
    index: usize,
    chunk: WireChunkExecutionData,
    opts: &DecodeOptions,
) -> Result<ChunkExecutionData, ConversionError> {
    let transactions = chunk
        .transactions
        .into_iter()
        .map(convert_transaction)
        .collect::<Result<_, _>>()?;
    let events = convert_events(chunk.events, &format!("chunks[{index}]."), opts)?;
    let transaction_results = chunk
        .transaction_results
        .into_iter()
        .map(|r| {
            Ok(LightTransactionResult {
                transaction_id: identifier("transaction result", "transaction_id", &r.transaction_id)?,
                failed: r.failed,
                computation_used: r.computation_used,
            })
        })
        .collect::<Result<_, ConversionError>>()?;
    Ok(ChunkExecutionData {
        transactions,
        events,
        trie_update: chunk.trie_update.map(convert_trie_update),
        transaction_results,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionDataConverter;

impl MessageConverter for ExecutionDataConverter {
    type Message = ExecutionDataMessage;
    type Record = ExecutionDataStreamResponse;
    const KIND: StreamKind = StreamKind::ExecutionData;

    fn convert(
        &self,
        msg: ExecutionDataMessage,
        opts: &DecodeOptions,
    ) -> Result<ExecutionDataStreamResponse, ConversionError> {
        let data = msg
            .block_execution_data
            .ok_or(ConversionError::EmptyMessage {
                entity: "execution data",
            })?;
        let chunks = data
            .chunk_execution_data
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| convert_chunk(i, chunk, opts))
            .collect::<Result<_, _>>()?;
        Ok(ExecutionDataStreamResponse {
            height: msg.block_height,
            execution_data: ExecutionData {
                block_id: identifier("execution data", "block_id", &data.block_id)?,
                chunks,
            },
            block_timestamp: msg.block_timestamp,
        })
    }

    fn height(msg: &ExecutionDataMessage) -> u64 {
        msg.block_height
    }
}

// ─── Account statuses ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct AccountStatusConverter;

impl MessageConverter for AccountStatusConverter {
    type Message = AccountStatusesMessage;
    type Record = AccountStatus;
    const KIND: StreamKind = StreamKind::AccountStatuses;

    fn convert(
        &self,
        msg: AccountStatusesMessage,
        opts: &DecodeOptions,
    ) -> Result<AccountStatus, ConversionError> {
        let results = msg
            .results
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                Ok(AccountStatusResult {
                    address: address("account status", "address", &r.address)?,
                    events: convert_events(r.events, &format!("results[{i}]."), opts)?,
                })
            })
            .collect::<Result<_, ConversionError>>()?;
        Ok(AccountStatus {
            block_id: identifier("account status", "block_id", &msg.block_id)?,
            block_height: msg.block_height,
            message_index: msg.message_index,
            results,
        })
    }

    fn height(msg: &AccountStatusesMessage) -> u64 {
        msg.block_height
    }

    fn message_index(msg: &AccountStatusesMessage) -> Option<u64> {
        Some(msg.message_index)
    }
}
