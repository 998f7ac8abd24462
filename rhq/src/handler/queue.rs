use std::{convert::Infallible, fmt, ptr, sync::Arc};

use super::{AsyncStatus, RequestHandler};
use crate::{executor::QueueExecutor, Connection, Instance, LocalError, OutgoingRequest, Reference, SendError};

/// Request handler that executes all sends and cancellations of its delegate
/// one at a time on a [QueueExecutor].
///
/// The state of the delegate is thus only ever touched from the serialized
/// execution context of the executor.
/// Sends submitted to the same handler reach the delegate in submission order.
///
/// The accessors [reference](RequestHandler::reference) and
/// [connection](RequestHandler::connection) are forwarded to the delegate
/// directly, without going through the executor.
pub struct QueueRequestHandler {
    delegate: Arc<dyn RequestHandler>,
    executor: Arc<QueueExecutor>,
}

impl fmt::Debug for QueueRequestHandler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("QueueRequestHandler")
            .field("reference", self.delegate.reference())
            .field("executor", &self.executor)
            .finish()
    }
}

impl QueueRequestHandler {
    /// Wraps the delegate, using the queue executor of the instance.
    ///
    /// # Panics
    /// Panics if the queue executor of the instance is first used outside of a Tokio runtime.
    pub fn new(instance: &Instance, delegate: Arc<dyn RequestHandler>) -> Self {
        Self { executor: instance.queue_executor(), delegate }
    }

    /// The wrapped handler.
    pub fn delegate(&self) -> &Arc<dyn RequestHandler> {
        &self.delegate
    }

    /// The executor the delegate's operations run on.
    pub fn executor(&self) -> &Arc<QueueExecutor> {
        &self.executor
    }
}

#[async_trait::async_trait]
impl RequestHandler for QueueRequestHandler {
    /// `previous` matches if it is this handler or its delegate.
    fn update(
        self: Arc<Self>, previous: &Arc<dyn RequestHandler>, replacement: Option<Arc<dyn RequestHandler>>,
    ) -> Option<Arc<dyn RequestHandler>> {
        let previous = Arc::as_ptr(previous);
        if !ptr::addr_eq(previous, Arc::as_ptr(&self)) && !ptr::addr_eq(previous, Arc::as_ptr(&self.delegate)) {
            return Some(self);
        }

        match replacement {
            Some(replacement) => {
                tracing::trace!(reference = %self.delegate.reference(), "replacing queued request handler");
                let instance = self.delegate.reference().instance();
                Some(Arc::new(Self::new(instance, replacement)))
            }
            None => {
                tracing::trace!(reference = %self.delegate.reference(), "dropping queued request handler");
                None
            }
        }
    }

    async fn send_async_request(&self, out: &Arc<OutgoingRequest>) -> Result<AsyncStatus, SendError> {
        tracing::trace!(id = out.id(), operation = out.operation(), "queueing request");
        let delegate = self.delegate.clone();
        let out = out.clone();
        self.executor.execute(move || async move { delegate.send_async_request(&out).await }).await
    }

    async fn async_request_canceled(&self, out: &Arc<OutgoingRequest>, reason: LocalError) {
        let delegate = self.delegate.clone();
        let out = out.clone();
        self.executor
            .execute_no_throw(move || async move {
                delegate.async_request_canceled(&out, reason).await;
                Ok::<_, Infallible>(())
            })
            .await;
    }

    fn reference(&self) -> &Arc<Reference> {
        self.delegate.reference()
    }

    fn connection(&self) -> Option<Arc<dyn Connection>> {
        self.delegate.connection()
    }
}
