//! Live transport connections.

use std::sync::Arc;

use crate::{handler::AsyncStatus, LocalError, OutgoingRequest, SendError};

/// A live connection to a remote endpoint.
///
/// Establishing connections and encoding requests are the concern of the
/// transport implementing this trait.
/// A connection completes the [OutgoingRequest] once its reply is received.
#[async_trait::async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Sends the request.
    ///
    /// If `response` is false, no reply is expected and the request should
    /// be completed once it has been sent.
    /// Fails with a [retry signal](SendError::Retry) if the connection cannot
    /// accept the request anymore, for example because it is closing.
    async fn send_async_request(
        &self, out: &Arc<OutgoingRequest>, compress: bool, response: bool,
    ) -> Result<AsyncStatus, SendError>;

    /// Notifies the connection that a request sent over it has been canceled.
    ///
    /// The connection is expected to stop tracking the request and complete it
    /// with `reason` if it has not been completed yet.
    async fn async_request_canceled(&self, out: &Arc<OutgoingRequest>, reason: LocalError);

    /// Human readable description of the connection, for example its endpoints.
    fn description(&self) -> String;
}
