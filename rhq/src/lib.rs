//! Request handler indirection with serialized queue execution for RPC proxies.
//!
//! A proxy delivers its requests through a [request handler](handler::RequestHandler),
//! which represents the current way of reaching the remote object.
//! When the connection of a proxy is lost and a new endpoint is selected, the
//! proxy's [handler slot](handler::HandlerCache) is updated with a new handler,
//! while requests already in flight keep using the handler they were accepted by.
//!
//! If [queueing](Cfg::queue_requests) is enabled, every handler is decorated by a
//! [QueueRequestHandler](handler::QueueRequestHandler).
//! It routes all sends and cancellations through the [QueueExecutor](executor::QueueExecutor)
//! of the [Instance], so that the wrapped handler is only ever driven from a single,
//! ordered lane of execution, even though requests are submitted concurrently.
//!
//! # Error handling
//!
//! Sending a request either succeeds with an [AsyncStatus](handler::AsyncStatus),
//! fails with a [retry signal](RetryError), upon which the caller must obtain a new
//! handler and resubmit, or fails fatally with a [LocalError].
//! Cancellations never fail.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rhq::{
//!     handler::{AsyncStatus, HandlerCache, RequestHandler},
//!     Connection, Instance, LocalError, OutgoingRequest, Reference, SendError,
//! };
//!
//! // A loopback transport that echoes the payload.
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl Connection for Echo {
//!     async fn send_async_request(
//!         &self, out: &Arc<OutgoingRequest>, _compress: bool, _response: bool,
//!     ) -> Result<AsyncStatus, SendError> {
//!         out.complete(Ok(out.payload().clone()));
//!         Ok(AsyncStatus::SentAndInvokedCallback)
//!     }
//!
//!     async fn async_request_canceled(&self, out: &Arc<OutgoingRequest>, reason: LocalError) {
//!         out.complete(Err(reason));
//!     }
//!
//!     fn description(&self) -> String {
//!         "echo".into()
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let instance = Arc::new(Instance::default());
//! let reference = Arc::new(Reference::new(instance.clone(), "echo").with_endpoint("tcp -p 10000"));
//! let cache = HandlerCache::new(reference);
//!
//! let handler = cache
//!     .get_or_connect(|reference| async move {
//!         let handler: Arc<dyn RequestHandler> =
//!             Arc::new(rhq::handler::ConnectionRequestHandler::new(reference, Arc::new(Echo)));
//!         Ok::<_, LocalError>(handler)
//!     })
//!     .await
//!     .unwrap();
//!
//! let (out, reply) = OutgoingRequest::new("ping", &b"hello"[..]);
//! assert!(handler.send_async_request(&out).await.unwrap().is_sent());
//! assert_eq!(&reply.await.unwrap()[..], b"hello");
//!
//! instance.destroy().await;
//! # });
//! ```

pub mod executor;
pub mod handler;

mod cfg;
mod connection;
mod error;
mod instance;
mod outgoing;
mod reference;

pub use cfg::Cfg;
pub use connection::Connection;
pub use error::{LocalError, RetryError, SendError};
pub use instance::Instance;
pub use outgoing::{OutgoingRequest, Reply};
pub use reference::{InvocationMode, Reference};
