//! `AccessClient`: one subscribe method per resource kind.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chainaccess_core::message::StreamKind;
use chainaccess_core::record::{
    AccountStatus, Block, BlockDigest, BlockEvents, BlockHeader, ExecutionDataStreamResponse,
};
use chainaccess_core::request::{
    AccountStatusFilter, AccountStatusesRequest, BlockStatus, BlocksRequest, EventFilter,
    EventsRequest, ExecutionDataRequest, StartOptions, StartSelector, StreamRequest,
};
use chainaccess_core::transport::{AccessTransport, BoxedStream};
use chainaccess_core::{InitError, SubscribeError};

use crate::adapter::StreamAdapter;
use crate::config::SubscribeConfig;
use crate::convert::{
    AccountStatusConverter, BlockConverter, BlockDigestConverter, BlockHeaderConverter,
    EventsConverter, ExecutionDataConverter, MessageConverter,
};
use crate::subscription::Subscription;

/// Opens subscriptions over an [`AccessTransport`].
///
/// Every subscribe call:
/// 1. validates the start point, filters and config (errors are returned
///    synchronously, nothing is opened),
/// 2. opens the stream, racing `cancel` (→ [`InitError::Cancelled`]),
/// 3. spawns the background task and returns its [`Subscription`].
///
/// Each subscription runs on a child of `cancel`: cancelling the parent stops
/// every subscription derived from it, while cancelling or dropping one
/// subscription leaves the parent untouched.
pub struct AccessClient<T: AccessTransport> {
    transport: Arc<T>,
    config: SubscribeConfig,
}

impl<T: AccessTransport> Clone for AccessClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
        }
    }
}

impl<T: AccessTransport> AccessClient<T> {
    pub fn new(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    pub fn from_arc(transport: Arc<T>) -> Self {
        Self {
            transport,
            config: SubscribeConfig::default(),
        }
    }

    /// A client sharing this one's transport but using `config`.
    pub fn with_subscribe_config(&self, config: SubscribeConfig) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config,
        }
    }

    pub fn config(&self) -> &SubscribeConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn subscribe_blocks(
        &self,
        cancel: &CancellationToken,
        start: impl Into<StartOptions>,
        block_status: BlockStatus,
    ) -> Result<Subscription<Block>, SubscribeError> {
        let stream = self.stream_request(start)?;
        let req = BlocksRequest {
            stream,
            block_status,
        };
        self.start(cancel, BlockConverter, self.transport.open_blocks(req))
            .await
    }

    pub async fn subscribe_block_headers(
        &self,
        cancel: &CancellationToken,
        start: impl Into<StartOptions>,
        block_status: BlockStatus,
    ) -> Result<Subscription<BlockHeader>, SubscribeError> {
        let stream = self.stream_request(start)?;
        let req = BlocksRequest {
            stream,
            block_status,
        };
        self.start(cancel, BlockHeaderConverter, self.transport.open_block_headers(req))
            .await
    }

    pub async fn subscribe_block_digests(
        &self,
        cancel: &CancellationToken,
        start: impl Into<StartOptions>,
        block_status: BlockStatus,
    ) -> Result<Subscription<BlockDigest>, SubscribeError> {
        let stream = self.stream_request(start)?;
        let req = BlocksRequest {
            stream,
            block_status,
        };
        self.start(cancel, BlockDigestConverter, self.transport.open_block_digests(req))
            .await
    }

    pub async fn subscribe_events(
        &self,
        cancel: &CancellationToken,
        start: impl Into<StartOptions>,
        filter: EventFilter,
    ) -> Result<Subscription<BlockEvents>, SubscribeError> {
        filter.validate()?;
        let stream = self.stream_request(start)?;
        let req = EventsRequest { stream, filter };
        self.start(cancel, EventsConverter, self.transport.open_events(req))
            .await
    }

    pub async fn subscribe_execution_data(
        &self,
        cancel: &CancellationToken,
        start: impl Into<StartOptions>,
    ) -> Result<Subscription<ExecutionDataStreamResponse>, SubscribeError> {
        let stream = self.stream_request(start)?;
        let req = ExecutionDataRequest { stream };
        self.start(
            cancel,
            ExecutionDataConverter,
            self.transport.open_execution_data(req),
        )
        .await
    }

    /// Account statuses carry a message index; the subscription fails with
    /// an ordering error on the first gap, duplicate or regression, counting
    /// from [`SubscribeConfig::starting_message_index`].
    pub async fn subscribe_account_statuses(
        &self,
        cancel: &CancellationToken,
        start: impl Into<StartOptions>,
        filter: AccountStatusFilter,
    ) -> Result<Subscription<AccountStatus>, SubscribeError> {
        filter.validate()?;
        let stream = self.stream_request(start)?;
        let req = AccountStatusesRequest { stream, filter };
        self.start(
            cancel,
            AccountStatusConverter,
            self.transport.open_account_statuses(req),
        )
        .await
    }

    fn stream_request(
        &self,
        start: impl Into<StartOptions>,
    ) -> Result<StreamRequest, SubscribeError> {
        let selector: StartSelector = start.into().validate()?;
        self.config.validate()?;
        Ok(StreamRequest::new(
            selector,
            self.config.heartbeat_interval,
            self.config.event_encoding,
        ))
    }

    async fn start<C, F>(
        &self,
        cancel: &CancellationToken,
        converter: C,
        open: F,
    ) -> Result<Subscription<C::Record>, SubscribeError>
    where
        C: MessageConverter,
        F: Future<Output = Result<BoxedStream<C::Message>, InitError>>,
    {
        let kind: StreamKind = C::KIND;
        let token = cancel.child_token();

        let opened = tokio::select! {
            biased;
            () = token.cancelled() => Err(InitError::Cancelled),
            res = open => res,
        };
        let stream = opened.map_err(|e| {
            warn!(kind = %kind, endpoint = self.transport.endpoint(), error = %e, "failed to open stream");
            e
        })?;
        info!(kind = %kind, endpoint = self.transport.endpoint(), "stream opened");

        let starting_index = kind
            .is_sequenced()
            .then_some(self.config.starting_message_index);
        Ok(StreamAdapter::spawn(
            stream,
            converter,
            self.config.decode_options,
            starting_index,
            token,
        ))
    }
}
