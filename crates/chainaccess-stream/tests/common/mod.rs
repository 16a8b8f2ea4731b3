//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use chainaccess_core::message::{
    AccountStatusesMessage, BlockDigestMessage, BlockHeaderMessage, BlockMessage, EventsMessage,
    ExecutionDataMessage, WireAccountStatusResult, WireBlock, WireBlockExecutionData,
    WireBlockHeader, WireBlockSeal, WireChunkExecutionData, WireCollectionGuarantee, WireEvent,
    WireTransactionResult,
};
use chainaccess_core::request::{
    AccountStatusesRequest, BlockDigestsRequest, BlockHeadersRequest, BlocksRequest,
    EventsRequest, ExecutionDataRequest,
};
use chainaccess_core::transport::{AccessTransport, BoxedStream, StreamHandle};
use chainaccess_core::value::{Composite, Encoding, Value};
use chainaccess_core::{InitError, TransportError};

/// One scripted outcome of `receive()`.
pub enum Step<M> {
    Msg(M),
    Fail(TransportError),
    /// Never resolves; only cancellation gets past it.
    Hang,
}

/// Counts live streams so tests can observe that tasks released them.
#[derive(Clone, Default)]
pub struct LiveStreams(Arc<AtomicUsize>);

impl LiveStreams {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ScriptedStream<M> {
    steps: std::collections::VecDeque<Step<M>>,
    terminal: Option<Result<(), TransportError>>,
    live: LiveStreams,
}

impl<M> ScriptedStream<M> {
    fn new(steps: Vec<Step<M>>, live: LiveStreams) -> Self {
        live.0.fetch_add(1, Ordering::SeqCst);
        Self {
            steps: steps.into(),
            terminal: None,
            live,
        }
    }
}

impl<M> Drop for ScriptedStream<M> {
    fn drop(&mut self) {
        self.live.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<M: Send> StreamHandle<M> for ScriptedStream<M> {
    async fn receive(&mut self) -> Result<Option<M>, TransportError> {
        if let Some(terminal) = &self.terminal {
            return terminal.clone().map(|_| None);
        }
        match self.steps.pop_front() {
            Some(Step::Msg(m)) => Ok(Some(m)),
            Some(Step::Fail(e)) => {
                self.terminal = Some(Err(e.clone()));
                Err(e)
            }
            Some(Step::Hang) => std::future::pending().await,
            None => {
                self.terminal = Some(Ok(()));
                Ok(None)
            }
        }
    }
}

/// How `open_*` behaves.
pub enum Open {
    Ready,
    Reject(InitError),
    /// Opening never completes.
    Hang,
}

type Script<M> = Mutex<Option<Vec<Step<M>>>>;

/// Hands out one scripted stream per kind and records the last request.
pub struct ScriptedTransport {
    pub open: Open,
    pub blocks: Script<BlockMessage>,
    pub headers: Script<BlockHeaderMessage>,
    pub digests: Script<BlockDigestMessage>,
    pub events: Script<EventsMessage>,
    pub execution: Script<ExecutionDataMessage>,
    pub accounts: Script<AccountStatusesMessage>,
    pub last_request: Mutex<Option<serde_json::Value>>,
    pub live: LiveStreams,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self {
            open: Open::Ready,
            blocks: Mutex::new(None),
            headers: Mutex::new(None),
            digests: Mutex::new(None),
            events: Mutex::new(None),
            execution: Mutex::new(None),
            accounts: Mutex::new(None),
            last_request: Mutex::new(None),
            live: LiveStreams::default(),
        }
    }
}

impl ScriptedTransport {
    pub fn with_blocks(steps: Vec<Step<BlockMessage>>) -> Self {
        let t = Self::default();
        *t.blocks.lock().unwrap() = Some(steps);
        t
    }

    pub fn with_headers(steps: Vec<Step<BlockHeaderMessage>>) -> Self {
        let t = Self::default();
        *t.headers.lock().unwrap() = Some(steps);
        t
    }

    pub fn with_execution(steps: Vec<Step<ExecutionDataMessage>>) -> Self {
        let t = Self::default();
        *t.execution.lock().unwrap() = Some(steps);
        t
    }

    pub fn with_digests(steps: Vec<Step<BlockDigestMessage>>) -> Self {
        let t = Self::default();
        *t.digests.lock().unwrap() = Some(steps);
        t
    }

    pub fn with_events(steps: Vec<Step<EventsMessage>>) -> Self {
        let t = Self::default();
        *t.events.lock().unwrap() = Some(steps);
        t
    }

    pub fn with_accounts(steps: Vec<Step<AccountStatusesMessage>>) -> Self {
        let t = Self::default();
        *t.accounts.lock().unwrap() = Some(steps);
        t
    }

    pub fn opening(mut self, open: Open) -> Self {
        self.open = open;
        self
    }

    async fn hand_out<M: Send + 'static, R: serde::Serialize>(
        &self,
        script: &Script<M>,
        req: &R,
    ) -> Result<BoxedStream<M>, InitError> {
        *self.last_request.lock().unwrap() = serde_json::to_value(req).ok();
        match &self.open {
            Open::Ready => {}
            Open::Reject(e) => return Err(e.clone()),
            Open::Hang => std::future::pending::<()>().await,
        }
        let steps = script
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| InitError::Rejected {
                code: 404,
                message: "no script for this kind".into(),
            })?;
        Ok(Box::new(ScriptedStream::new(steps, self.live.clone())))
    }
}

#[async_trait]
impl AccessTransport for ScriptedTransport {
    async fn open_blocks(&self, req: BlocksRequest) -> Result<BoxedStream<BlockMessage>, InitError> {
        self.hand_out(&self.blocks, &req).await
    }

    async fn open_block_headers(
        &self,
        req: BlockHeadersRequest,
    ) -> Result<BoxedStream<BlockHeaderMessage>, InitError> {
        self.hand_out(&self.headers, &req).await
    }

    async fn open_block_digests(
        &self,
        req: BlockDigestsRequest,
    ) -> Result<BoxedStream<BlockDigestMessage>, InitError> {
        self.hand_out(&self.digests, &req).await
    }

    async fn open_events(&self, req: EventsRequest) -> Result<BoxedStream<EventsMessage>, InitError> {
        self.hand_out(&self.events, &req).await
    }

    async fn open_execution_data(
        &self,
        req: ExecutionDataRequest,
    ) -> Result<BoxedStream<ExecutionDataMessage>, InitError> {
        self.hand_out(&self.execution, &req).await
    }

    async fn open_account_statuses(
        &self,
        req: AccountStatusesRequest,
    ) -> Result<BoxedStream<AccountStatusesMessage>, InitError> {
        self.hand_out(&self.accounts, &req).await
    }

    fn endpoint(&self) -> &str {
        "scripted"
    }
}

// ─── Message builders ─────────────────────────────────────────────────────────

pub fn ts(height: u64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + height as i64, 0).unwrap()
}

pub fn block_id(height: u64) -> Vec<u8> {
    let mut id = vec![0u8; 32];
    id[24..].copy_from_slice(&height.to_be_bytes());
    id
}

pub fn digest(height: u64) -> BlockDigestMessage {
    BlockDigestMessage {
        block_id: block_id(height),
        block_height: height,
        block_timestamp: ts(height),
    }
}

pub fn account_created(address_byte: u8) -> Value {
    Value::Event(Composite::new(
        "flow.AccountCreated",
        vec![(
            "address".into(),
            Value::Address(chainaccess_core::Address([0, 0, 0, 0, 0, 0, 0, address_byte])),
        )],
    ))
}

pub fn wire_event(index: u32, payload: Vec<u8>) -> WireEvent {
    WireEvent {
        event_type: "flow.AccountCreated".into(),
        transaction_id: vec![0xaa; 32],
        transaction_index: 0,
        event_index: index,
        payload,
    }
}

pub fn compact(value: &Value) -> Vec<u8> {
    chainaccess_codec::encode(value, Encoding::Compact).unwrap()
}

pub fn verbose(value: &Value) -> Vec<u8> {
    chainaccess_codec::encode(value, Encoding::Verbose).unwrap()
}

pub fn events_at(height: u64, events: Vec<WireEvent>) -> EventsMessage {
    EventsMessage {
        block_id: block_id(height),
        block_height: height,
        block_timestamp: ts(height),
        events,
    }
}

pub fn account_status(height: u64, message_index: u64) -> AccountStatusesMessage {
    AccountStatusesMessage {
        block_id: block_id(height),
        block_height: height,
        message_index,
        results: vec![WireAccountStatusResult {
            address: vec![0, 0, 0, 0, 0, 0, 0, 1],
            events: vec![wire_event(0, compact(&account_created(1)))],
        }],
    }
}

pub fn block(height: u64) -> BlockMessage {
    BlockMessage {
        block: Some(WireBlock {
            id: block_id(height),
            parent_id: block_id(height - 1),
            height,
            timestamp: ts(height),
            collection_guarantees: vec![WireCollectionGuarantee {
                collection_id: vec![0xcc; 32],
                signer_indices: vec![1, 0, 1],
            }],
            block_seals: vec![WireBlockSeal {
                block_id: block_id(height - 1),
                execution_receipt_id: vec![0xee; 32],
            }],
        }),
    }
}

pub fn header(height: u64) -> BlockHeaderMessage {
    BlockHeaderMessage {
        header: Some(WireBlockHeader {
            id: block_id(height),
            parent_id: block_id(height - 1),
            height,
            timestamp: ts(height),
        }),
    }
}

pub fn execution_data(height: u64, events: Vec<WireEvent>) -> ExecutionDataMessage {
    ExecutionDataMessage {
        block_height: height,
        block_timestamp: ts(height),
        block_execution_data: Some(WireBlockExecutionData {
            block_id: block_id(height),
            chunk_execution_data: vec![WireChunkExecutionData {
                transactions: vec![],
                events,
                trie_update: None,
                transaction_results: vec![WireTransactionResult {
                    transaction_id: vec![0xaa; 32],
                    failed: false,
                    computation_used: 42,
                }],
            }],
        }),
    }
}
