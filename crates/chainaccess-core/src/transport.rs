//! The `AccessTransport` trait: the seam between the subscription layer and
//! whatever carries server-streaming calls over the network.

use async_trait::async_trait;

use crate::error::{InitError, TransportError};
use crate::message::{
    AccountStatusesMessage, BlockDigestMessage, BlockHeaderMessage, BlockMessage, EventsMessage,
    ExecutionDataMessage,
};
use crate::request::{
    AccountStatusesRequest, BlockDigestsRequest, BlockHeadersRequest, BlocksRequest,
    EventsRequest, ExecutionDataRequest,
};

/// Handle to one in-progress server-streaming call.
///
/// `Ok(Some(msg))` is the next message, `Ok(None)` is a clean end of stream.
/// Once `Ok(None)` or an error has been returned, every further call must
/// return that same outcome.
///
/// Cancellation is the caller's concern: the adapter drops the pending
/// `receive` future when its token fires, so implementations must be
/// cancel-safe at the `await` points they expose.
#[async_trait]
pub trait StreamHandle<M>: Send {
    async fn receive(&mut self) -> Result<Option<M>, TransportError>;
}

pub type BoxedStream<M> = Box<dyn StreamHandle<M>>;

/// Opens server-streaming calls, one per resource kind.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; one transport is shared by every
/// subscription opened through it.
#[async_trait]
pub trait AccessTransport: Send + Sync + 'static {
    async fn open_blocks(&self, req: BlocksRequest)
        -> Result<BoxedStream<BlockMessage>, InitError>;

    async fn open_block_headers(
        &self,
        req: BlockHeadersRequest,
    ) -> Result<BoxedStream<BlockHeaderMessage>, InitError>;

    async fn open_block_digests(
        &self,
        req: BlockDigestsRequest,
    ) -> Result<BoxedStream<BlockDigestMessage>, InitError>;

    async fn open_events(&self, req: EventsRequest)
        -> Result<BoxedStream<EventsMessage>, InitError>;

    async fn open_execution_data(
        &self,
        req: ExecutionDataRequest,
    ) -> Result<BoxedStream<ExecutionDataMessage>, InitError>;

    async fn open_account_statuses(
        &self,
        req: AccountStatusesRequest,
    ) -> Result<BoxedStream<AccountStatusesMessage>, InitError>;

    /// The transport's identifier (URL or name), for logs.
    fn endpoint(&self) -> &str;
}
