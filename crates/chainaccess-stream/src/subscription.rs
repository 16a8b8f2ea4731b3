//! The caller-facing side of a running stream.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use chainaccess_core::message::StreamKind;
use chainaccess_core::StreamError;

/// How a subscription's background task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Running,
    /// The server ended the stream cleanly.
    Completed,
    /// A transport, conversion or ordering error ended the stream.
    Failed,
    Cancelled,
}

/// Counters for one subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubscriptionStats {
    pub messages_received: u64,
    pub records_delivered: u64,
    pub outcome: Outcome,
}

pub(crate) type SharedStats = Arc<Mutex<SubscriptionStats>>;

pub(crate) fn lock(stats: &SharedStats) -> MutexGuard<'_, SubscriptionStats> {
    stats.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A running subscription: a data channel, an error channel and the token
/// that stops it.
///
/// Records arrive in the order the server sent them. When the stream ends the
/// data channel closes; if it ended because of an error, exactly one
/// [`StreamError`] is waiting on the error channel. A cancelled subscription
/// closes without an error.
///
/// Dropping a `Subscription` cancels it.
pub struct Subscription<T> {
    kind: StreamKind,
    data: mpsc::Receiver<T>,
    errors: mpsc::Receiver<StreamError>,
    cancel: CancellationToken,
    guard: DropGuard,
    stats: SharedStats,
    task: Option<JoinHandle<()>>,
}

/// The raw pieces of a [`Subscription`], see [`Subscription::into_parts`].
pub struct SubscriptionParts<T> {
    pub data: mpsc::Receiver<T>,
    pub errors: mpsc::Receiver<StreamError>,
    pub cancel: CancellationToken,
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("stats", &*lock(&self.stats))
            .finish()
    }
}

impl<T> Subscription<T> {
    pub(crate) fn new(
        kind: StreamKind,
        data: mpsc::Receiver<T>,
        errors: mpsc::Receiver<StreamError>,
        cancel: CancellationToken,
        stats: SharedStats,
        task: JoinHandle<()>,
    ) -> Self {
        let guard = cancel.clone().drop_guard();
        Self {
            kind,
            data,
            errors,
            cancel,
            guard,
            stats,
            task: Some(task),
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// The next record, or `None` once the stream has ended for any reason.
    pub async fn next(&mut self) -> Option<T> {
        self.data.recv().await
    }

    /// The terminal error, if the stream failed.
    ///
    /// Resolves once the background task has finished, so call it after
    /// [`next`](Self::next) has returned `None` or after cancelling.
    pub async fn error(&mut self) -> Option<StreamError> {
        self.errors.recv().await
    }

    /// Records first, then the terminal error (if any), then `None`.
    pub async fn recv(&mut self) -> Option<Result<T, StreamError>> {
        if let Some(record) = self.data.recv().await {
            return Some(Ok(record));
        }
        self.errors.recv().await.map(Err)
    }

    /// Stop the subscription. Both channels close shortly after.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A child of this subscription's token, cancelled along with it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn stats(&self) -> SubscriptionStats {
        lock(&self.stats).clone()
    }

    /// Wait for the background task to exit.
    ///
    /// The task blocks while a record is waiting to be read, so either drain
    /// the subscription or cancel it first.
    pub async fn closed(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(kind = %self.kind, error = %e, "subscription task panicked");
            }
        }
    }

    /// Take the raw receivers and token.
    ///
    /// The returned parts no longer cancel on drop; cancel the token when
    /// done with them.
    pub fn into_parts(self) -> SubscriptionParts<T> {
        let Self {
            data,
            errors,
            cancel,
            guard,
            ..
        } = self;
        let _ = guard.disarm();
        SubscriptionParts {
            data,
            errors,
            cancel,
        }
    }

    /// Adapt into a `Stream` of records followed by the terminal error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, StreamError>> {
        futures::stream::unfold(self, |mut sub| async move {
            let item = sub.recv().await?;
            Some((item, sub))
        })
    }
}
