//! Outgoing requests and their replies.

use bytes::Bytes;
use futures::{Future, FutureExt};
use std::{
    fmt,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    task::{Context, Poll},
};
use tokio::sync::oneshot;

use crate::LocalError;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A request handed to a [request handler](crate::handler::RequestHandler).
///
/// The request is completed exactly once, either with the reply received
/// from the remote endpoint or with a local error, for example when it is canceled.
/// Later completions are ignored, which resolves races between a reply and a cancellation.
pub struct OutgoingRequest {
    id: u64,
    operation: String,
    payload: Bytes,
    reply_tx: Mutex<Option<oneshot::Sender<Result<Bytes, LocalError>>>>,
}

impl fmt::Debug for OutgoingRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("OutgoingRequest")
            .field("id", &self.id)
            .field("operation", &self.operation)
            .field("payload_len", &self.payload.len())
            .field("completed", &self.is_completed())
            .finish()
    }
}

impl OutgoingRequest {
    /// Creates a new request invoking the specified operation with the encoded payload.
    ///
    /// Returns the request together with a future that resolves to its reply.
    pub fn new(operation: impl Into<String>, payload: impl Into<Bytes>) -> (Arc<Self>, Reply) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let req = Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            operation: operation.into(),
            payload: payload.into(),
            reply_tx: Mutex::new(Some(reply_tx)),
        };
        (Arc::new(req), Reply(reply_rx))
    }

    /// Locally unique id of the request.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the invoked operation.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Encoded request payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Completes the request.
    ///
    /// Returns false if the request has already been completed.
    pub fn complete(&self, result: Result<Bytes, LocalError>) -> bool {
        let Some(reply_tx) = self.reply_tx.lock().unwrap().take() else { return false };
        let _ = reply_tx.send(result);
        true
    }

    /// Whether the request has been completed.
    pub fn is_completed(&self) -> bool {
        self.reply_tx.lock().unwrap().is_none()
    }
}

/// Reply to an [OutgoingRequest].
///
/// Resolves to [LocalError::Canceled] if the request is dropped without being completed.
pub struct Reply(oneshot::Receiver<Result<Bytes, LocalError>>);

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Reply").finish()
    }
}

impl Future for Reply {
    type Output = Result<Bytes, LocalError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        self.0.poll_unpin(cx).map(|res| res.unwrap_or(Err(LocalError::Canceled)))
    }
}
