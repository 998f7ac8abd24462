//! Request handlers.
//!
//! A request handler represents the current way of delivering requests of a
//! proxy to its remote object.
//! Two variants are provided:
//!
//!   * [ConnectionRequestHandler] sends requests directly over a live [Connection],
//!   * [QueueRequestHandler] decorates another handler and routes all its sends and
//!     cancellations through the [queue executor](crate::executor::QueueExecutor)
//!     of the instance.
//!
//! Handlers are immutable.
//! When the connection of a proxy changes, its [HandlerCache] computes the next
//! handler with [RequestHandler::update], which returns a new handler instead of
//! modifying the existing one.
//! Holders of the previous handler, such as in-flight sends, are not affected.
//!
//! Handlers are compared by identity, i.e. by the address of their allocation,
//! and never structurally.

use std::{ptr, sync::Arc};

use crate::{Connection, LocalError, OutgoingRequest, Reference, SendError};

mod cache;
mod connection;
mod queue;

pub use cache::HandlerCache;
pub use connection::ConnectionRequestHandler;
pub use queue::QueueRequestHandler;

/// How a request was accepted by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsyncStatus {
    /// The request has been queued and will be sent later.
    Queued,
    /// The request has been sent.
    Sent,
    /// The request has been sent and the sent callback has already been invoked.
    SentAndInvokedCallback,
}

impl AsyncStatus {
    /// Whether the request has been handed to the transport.
    pub fn is_sent(self) -> bool {
        matches!(self, Self::Sent | Self::SentAndInvokedCallback)
    }
}

/// Something capable of delivering requests to a remote object.
#[async_trait::async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Computes the handler that replaces this one.
    ///
    /// If `previous` is not the handler the caller observed as current, i.e. it
    /// does not match this handler according to the variant's rules, this handler
    /// is returned unchanged.
    /// Otherwise the handler for `replacement` is returned, or `None` if no
    /// replacement is available and the caller must resolve a new handler.
    fn update(
        self: Arc<Self>, previous: &Arc<dyn RequestHandler>, replacement: Option<Arc<dyn RequestHandler>>,
    ) -> Option<Arc<dyn RequestHandler>>;

    /// Hands the request to the transport.
    ///
    /// Fails with a [retry signal](SendError::Retry) if the caller must
    /// obtain a new handler and resubmit the request.
    async fn send_async_request(&self, out: &Arc<OutgoingRequest>) -> Result<AsyncStatus, SendError>;

    /// Notifies the handler that a previously sent request has been canceled.
    async fn async_request_canceled(&self, out: &Arc<OutgoingRequest>, reason: LocalError);

    /// Reference of the proxy the handler delivers requests for.
    fn reference(&self) -> &Arc<Reference>;

    /// The live connection used by the handler, if it is connected.
    fn connection(&self) -> Option<Arc<dyn Connection>>;
}

/// Whether both handlers are the same instance.
pub fn same_handler(a: &Arc<dyn RequestHandler>, b: &Arc<dyn RequestHandler>) -> bool {
    ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
