//! `WsTransport`: [`AccessTransport`] over one WebSocket per subscription.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};
use uuid::Uuid;

use chainaccess_core::message::{
    AccountStatusesMessage, BlockDigestMessage, BlockHeaderMessage, BlockMessage, EventsMessage,
    ExecutionDataMessage, StreamKind,
};
use chainaccess_core::request::{
    AccountStatusesRequest, BlockDigestsRequest, BlockHeadersRequest, BlocksRequest,
    EventsRequest, ExecutionDataRequest,
};
use chainaccess_core::transport::{AccessTransport, BoxedStream};
use chainaccess_core::{InitError, TransportError};

use crate::config::WsTransportConfig;
use crate::frame::{self, Inbound, SubscribeFrame};
use crate::stream::{Socket, WsStream};

pub struct WsTransport {
    config: WsTransportConfig,
}

impl WsTransport {
    pub fn new(config: WsTransportConfig) -> Self {
        Self { config }
    }

    pub fn connect_url(url: impl Into<String>) -> Self {
        Self::new(WsTransportConfig::new(url))
    }

    pub fn config(&self) -> &WsTransportConfig {
        &self.config
    }

    async fn open<M, A>(&self, kind: StreamKind, arguments: &A) -> Result<BoxedStream<M>, InitError>
    where
        M: DeserializeOwned + Send + 'static,
        A: Serialize + Sync,
    {
        let ms = self.config.connect_timeout_ms;
        let stream = tokio::time::timeout(Duration::from_millis(ms), self.handshake(kind, arguments))
            .await
            .map_err(|_| InitError::Timeout { ms })??;
        Ok(Box::new(stream))
    }

    async fn handshake<M, A>(&self, kind: StreamKind, arguments: &A) -> Result<WsStream<M>, InitError>
    where
        A: Serialize + Sync,
    {
        let url = &self.config.url;
        let connect_err = |e: tokio_tungstenite::tungstenite::Error| InitError::Connect {
            url: url.clone(),
            reason: e.to_string(),
        };

        let (mut socket, _) = connect_async(url.as_str()).await.map_err(connect_err)?;
        debug!(url = %url, kind = %kind, "websocket connected");

        let subscription_id = Uuid::new_v4().to_string();
        let request = SubscribeFrame::new(&subscription_id, kind.topic(), arguments);
        let text = serde_json::to_string(&request)
            .map_err(|e| InitError::Transport(TransportError::Other(e.to_string())))?;
        socket.send(Message::Text(text)).await.map_err(connect_err)?;

        let pending = await_ack(&mut socket, &subscription_id).await?;
        info!(url = %url, kind = %kind, id = %subscription_id, "subscription acknowledged");
        Ok(WsStream::new(kind, subscription_id, socket, pending))
    }
}

/// Wait for the server's answer to a subscribe frame.
///
/// Returns the first data payload if the server skipped the ack and started
/// streaming straight away.
async fn await_ack(
    socket: &mut Socket,
    subscription_id: &str,
) -> Result<Option<serde_json::Value>, InitError> {
    loop {
        let frame = match socket.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return Err(TransportError::Connection(e.to_string()).into()),
            None => return Err(TransportError::Closed.into()),
        };
        match frame {
            Message::Text(text) => match frame::parse(&text, subscription_id) {
                Ok(Inbound::Ack) => return Ok(None),
                Ok(Inbound::Data(payload)) => return Ok(Some(payload)),
                Ok(Inbound::Error(body)) => {
                    return Err(InitError::Rejected {
                        code: body.code,
                        message: body.message,
                    })
                }
                Ok(Inbound::Ignored) => continue,
                Err(e) => return Err(TransportError::Decode(e).into()),
            },
            Message::Ping(data) => socket
                .send(Message::Pong(data))
                .await
                .map_err(|e| TransportError::Connection(e.to_string()))?,
            Message::Close(_) => return Err(TransportError::Closed.into()),
            _ => continue,
        }
    }
}

#[async_trait]
impl AccessTransport for WsTransport {
    async fn open_blocks(&self, req: BlocksRequest) -> Result<BoxedStream<BlockMessage>, InitError> {
        self.open(StreamKind::Blocks, &req).await
    }

    async fn open_block_headers(
        &self,
        req: BlockHeadersRequest,
    ) -> Result<BoxedStream<BlockHeaderMessage>, InitError> {
        self.open(StreamKind::BlockHeaders, &req).await
    }

    async fn open_block_digests(
        &self,
        req: BlockDigestsRequest,
    ) -> Result<BoxedStream<BlockDigestMessage>, InitError> {
        self.open(StreamKind::BlockDigests, &req).await
    }

    async fn open_events(&self, req: EventsRequest) -> Result<BoxedStream<EventsMessage>, InitError> {
        self.open(StreamKind::Events, &req).await
    }

    async fn open_execution_data(
        &self,
        req: ExecutionDataRequest,
    ) -> Result<BoxedStream<ExecutionDataMessage>, InitError> {
        self.open(StreamKind::ExecutionData, &req).await
    }

    async fn open_account_statuses(
        &self,
        req: AccountStatusesRequest,
    ) -> Result<BoxedStream<AccountStatusesMessage>, InitError> {
        self.open(StreamKind::AccountStatuses, &req).await
    }

    fn endpoint(&self) -> &str {
        &self.config.url
    }
}
