//! `StreamAdapter`: turns a pull-based [`StreamHandle`] into a push-based
//! [`Subscription`].
//!
//! One Tokio task per subscription owns the handle and loops
//! receive → check order → convert → send. Both channels hold a single item,
//! so the task never runs more than one record ahead of the caller. Every
//! blocking point races the subscription's cancellation token.
//!
//! ```text
//!  Running ──► end of stream ──► Completed ─┐
//!     │──────► error ─────────► Failed ─────┼──► senders dropped, channels closed
//!     └──────► token fired ───► Cancelled ──┘
//! ```

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use chainaccess_codec::DecodeOptions;
use chainaccess_core::transport::BoxedStream;
use chainaccess_core::StreamError;

use crate::convert::MessageConverter;
use crate::ordering::SequenceState;
use crate::subscription::{lock, Outcome, SharedStats, Subscription, SubscriptionStats};

/// How the receive loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    EndOfStream,
    Cancelled,
}

pub struct StreamAdapter<C: MessageConverter> {
    stream: BoxedStream<C::Message>,
    converter: C,
    options: DecodeOptions,
    sequence: Option<SequenceState>,
    data_tx: mpsc::Sender<C::Record>,
    err_tx: mpsc::Sender<StreamError>,
    cancel: CancellationToken,
    stats: SharedStats,
}

impl<C: MessageConverter> StreamAdapter<C> {
    /// Start the background task and return the caller's side.
    ///
    /// `cancel` should be a token owned by this subscription alone: dropping
    /// or cancelling the returned [`Subscription`] cancels it.
    /// `starting_index` enables sequence checks for kinds that carry an index.
    pub fn spawn(
        stream: BoxedStream<C::Message>,
        converter: C,
        options: DecodeOptions,
        starting_index: Option<u64>,
        cancel: CancellationToken,
    ) -> Subscription<C::Record> {
        let (data_tx, data_rx) = mpsc::channel(1);
        let (err_tx, err_rx) = mpsc::channel(1);
        let stats: SharedStats = Arc::new(Mutex::new(SubscriptionStats::default()));

        let sequence = starting_index
            .filter(|_| C::KIND.is_sequenced())
            .map(SequenceState::new);

        let adapter = Self {
            stream,
            converter,
            options,
            sequence,
            data_tx,
            err_tx,
            cancel: cancel.clone(),
            stats: Arc::clone(&stats),
        };
        let task = tokio::spawn(adapter.run());

        Subscription::new(C::KIND, data_rx, err_rx, cancel, stats, task)
    }

    async fn run(mut self) {
        let kind = C::KIND;
        debug!(kind = %kind, "subscription running");

        match self.pump().await {
            Ok(Terminal::EndOfStream) => {
                self.finish(Outcome::Completed);
                info!(kind = %kind, "stream ended");
            }
            Ok(Terminal::Cancelled) => {
                self.finish(Outcome::Cancelled);
                debug!(kind = %kind, "subscription cancelled");
            }
            Err(err) => {
                self.finish(Outcome::Failed);
                warn!(kind = %kind, error = %err, "subscription failed");
                self.deliver_error(err).await;
            }
        }
        // Dropping `self` drops both senders, closing the channels.
    }

    fn finish(&self, outcome: Outcome) {
        lock(&self.stats).outcome = outcome;
    }

    async fn pump(&mut self) -> Result<Terminal, StreamError> {
        let kind = C::KIND.label();
        loop {
            let received = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Ok(Terminal::Cancelled),
                r = self.stream.receive() => r,
            };

            let msg = match received {
                Ok(Some(msg)) => msg,
                Ok(None) => return Ok(Terminal::EndOfStream),
                // A transport failure caused by cancellation is not an error.
                Err(_) if self.cancel.is_cancelled() => return Ok(Terminal::Cancelled),
                Err(source) => return Err(StreamError::Transport { kind, source }),
            };
            lock(&self.stats).messages_received += 1;

            let height = C::height(&msg);
            if let (Some(seq), Some(index)) = (self.sequence.as_mut(), C::message_index(&msg)) {
                seq.check_and_advance(index)
                    .map_err(|source| StreamError::Ordering {
                        kind,
                        height,
                        source,
                    })?;
            }

            let record = self
                .converter
                .convert(msg, &self.options)
                .map_err(|source| StreamError::Conversion {
                    kind,
                    height,
                    source,
                })?;

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Ok(Terminal::Cancelled),
                sent = self.data_tx.send(record) => {
                    if sent.is_err() {
                        // Receiver dropped without cancelling.
                        return Ok(Terminal::Cancelled);
                    }
                }
            }
            lock(&self.stats).records_delivered += 1;
            trace!(kind = %C::KIND, height, "record delivered");
        }
    }

    /// Best effort: if the caller has already cancelled, the error is dropped.
    async fn deliver_error(&mut self, err: StreamError) {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!(kind = %C::KIND, error = %err, "error dropped, subscription cancelled");
            }
            _ = self.err_tx.send(err.clone()) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    use async_trait::async_trait;
    use chainaccess_core::message::BlockDigestMessage;
    use chainaccess_core::transport::StreamHandle;
    use chainaccess_core::TransportError;

    use crate::convert::BlockDigestConverter;

    /// Yields `count` digests then fails. `Cell` makes it `Send` but not `Sync`.
    struct FailingHandle {
        remaining: Cell<u64>,
    }

    #[async_trait]
    impl StreamHandle<BlockDigestMessage> for FailingHandle {
        async fn receive(&mut self) -> Result<Option<BlockDigestMessage>, TransportError> {
            let left = self.remaining.get();
            if left == 0 {
                return Err(TransportError::Remote {
                    code: 500,
                    message: "node restarting".into(),
                });
            }
            self.remaining.set(left - 1);
            Ok(Some(BlockDigestMessage {
                block_id: vec![7; 32],
                block_height: 100 - left,
                block_timestamp: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            }))
        }
    }

    #[tokio::test]
    async fn non_sync_handle_delivers_records_then_error() {
        let handle = FailingHandle {
            remaining: Cell::new(2),
        };
        let mut sub = StreamAdapter::spawn(
            Box::new(handle),
            BlockDigestConverter,
            DecodeOptions::default(),
            None,
            CancellationToken::new(),
        );

        let bound = Duration::from_secs(2);
        let first = tokio::time::timeout(bound, sub.next()).await.unwrap().unwrap();
        let second = tokio::time::timeout(bound, sub.next()).await.unwrap().unwrap();
        assert_eq!((first.height, second.height), (98, 99));
        assert!(tokio::time::timeout(bound, sub.next()).await.unwrap().is_none());

        let err = tokio::time::timeout(bound, sub.error()).await.unwrap().unwrap();
        assert!(err.is_transport());
        sub.closed().await;
        assert_eq!(sub.stats().outcome, Outcome::Failed);
        assert_eq!(sub.stats().records_delivered, 2);
    }
}
