use std::{fmt, ptr, sync::Arc};

use super::{same_handler, AsyncStatus, RequestHandler};
use crate::{Connection, LocalError, OutgoingRequest, Reference, SendError};

/// Request handler sending requests directly over a live connection.
pub struct ConnectionRequestHandler {
    reference: Arc<Reference>,
    connection: Arc<dyn Connection>,
}

impl fmt::Debug for ConnectionRequestHandler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConnectionRequestHandler")
            .field("reference", &self.reference)
            .field("connection", &self.connection.description())
            .finish()
    }
}

impl ConnectionRequestHandler {
    /// Creates a handler delivering requests for `reference` over `connection`.
    pub fn new(reference: Arc<Reference>, connection: Arc<dyn Connection>) -> Self {
        Self { reference, connection }
    }
}

#[async_trait::async_trait]
impl RequestHandler for ConnectionRequestHandler {
    /// `previous` matches if it is this handler or any handler bound to the same connection.
    fn update(
        self: Arc<Self>, previous: &Arc<dyn RequestHandler>, replacement: Option<Arc<dyn RequestHandler>>,
    ) -> Option<Arc<dyn RequestHandler>> {
        let this: Arc<dyn RequestHandler> = self.clone();
        if same_handler(previous, &this) {
            return replacement;
        }

        match previous.connection() {
            Some(conn) if ptr::addr_eq(Arc::as_ptr(&conn), Arc::as_ptr(&self.connection)) => replacement,
            _ => Some(this),
        }
    }

    async fn send_async_request(&self, out: &Arc<OutgoingRequest>) -> Result<AsyncStatus, SendError> {
        let response = self.reference.mode().expects_response();
        self.connection.send_async_request(out, self.reference.compress(), response).await
    }

    async fn async_request_canceled(&self, out: &Arc<OutgoingRequest>, reason: LocalError) {
        self.connection.async_request_canceled(out, reason).await
    }

    fn reference(&self) -> &Arc<Reference> {
        &self.reference
    }

    fn connection(&self) -> Option<Arc<dyn Connection>> {
        Some(self.connection.clone())
    }
}
