//! `WsStream`: one subscription's socket as a [`StreamHandle`].

use std::marker::PhantomData;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use chainaccess_core::message::StreamKind;
use chainaccess_core::transport::StreamHandle;
use chainaccess_core::TransportError;

use crate::frame::{self, Inbound};

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reads data frames for a single subscription and decodes their payloads
/// as `M`.
///
/// A server close ends the stream cleanly; an error frame, a socket error or
/// a frame that does not decode as `M` fails it. Either way the outcome is
/// repeated on every later `receive`.
pub struct WsStream<M> {
    kind: StreamKind,
    subscription_id: String,
    socket: Socket,
    /// A data frame that arrived during the handshake.
    pending: Option<serde_json::Value>,
    terminal: Option<Result<(), TransportError>>,
    _message: PhantomData<fn() -> M>,
}

impl<M> WsStream<M> {
    pub(crate) fn new(
        kind: StreamKind,
        subscription_id: String,
        socket: Socket,
        pending: Option<serde_json::Value>,
    ) -> Self {
        Self {
            kind,
            subscription_id,
            socket,
            pending,
            terminal: None,
            _message: PhantomData,
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    fn end(&mut self, outcome: Result<(), TransportError>) -> Result<Option<M>, TransportError> {
        self.terminal = Some(outcome.clone());
        outcome.map(|()| None)
    }
}

impl<M: DeserializeOwned> WsStream<M> {
    fn decode(&mut self, payload: serde_json::Value) -> Result<Option<M>, TransportError> {
        match serde_json::from_value(payload) {
            Ok(msg) => Ok(Some(msg)),
            Err(e) => {
                warn!(kind = %self.kind, id = %self.subscription_id, error = %e, "undecodable payload");
                self.end(Err(TransportError::Decode(e.to_string())))
            }
        }
    }
}

#[async_trait]
impl<M: DeserializeOwned + Send> StreamHandle<M> for WsStream<M> {
    async fn receive(&mut self) -> Result<Option<M>, TransportError> {
        if let Some(terminal) = &self.terminal {
            return terminal.clone().map(|()| None);
        }
        if let Some(payload) = self.pending.take() {
            return self.decode(payload);
        }

        loop {
            let frame = match self.socket.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    warn!(kind = %self.kind, id = %self.subscription_id, error = %e, "websocket error");
                    return self.end(Err(TransportError::Connection(e.to_string())));
                }
                None => {
                    info!(kind = %self.kind, id = %self.subscription_id, "websocket stream ended");
                    return self.end(Ok(()));
                }
            };

            match frame {
                Message::Text(text) => match frame::parse(&text, &self.subscription_id) {
                    Ok(Inbound::Data(payload)) => return self.decode(payload),
                    Ok(Inbound::Error(body)) => {
                        warn!(kind = %self.kind, id = %self.subscription_id, code = body.code, "server reported error");
                        return self.end(Err(TransportError::Remote {
                            code: body.code,
                            message: body.message,
                        }));
                    }
                    Ok(Inbound::Ack | Inbound::Ignored) => continue,
                    Err(e) => return self.end(Err(TransportError::Decode(e))),
                },
                Message::Ping(data) => {
                    if let Err(e) = self.socket.send(Message::Pong(data)).await {
                        return self.end(Err(TransportError::Connection(e.to_string())));
                    }
                }
                Message::Close(reason) => {
                    info!(kind = %self.kind, id = %self.subscription_id, ?reason, "server closed subscription");
                    return self.end(Ok(()));
                }
                other => {
                    debug!(kind = %self.kind, frame = ?other, "ignoring non-text frame");
                }
            }
        }
    }
}
