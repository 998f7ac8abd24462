use futures::Future;
use std::{
    fmt,
    sync::{Arc, Mutex},
};

use super::{same_handler, RequestHandler};
use crate::Reference;

/// The request handler slot of a proxy.
///
/// If the [reference](Reference::cache_connection) caches connections, the
/// handler obtained by [get_or_connect](Self::get_or_connect) is kept and
/// reused by all requests of the proxy until it is
/// [updated](Self::update) or [cleared](Self::clear).
pub struct HandlerCache {
    reference: Arc<Reference>,
    handler: Mutex<Option<Arc<dyn RequestHandler>>>,
}

impl fmt::Debug for HandlerCache {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HandlerCache")
            .field("reference", &self.reference)
            .field("cached", &self.handler.lock().unwrap().is_some())
            .finish()
    }
}

impl HandlerCache {
    /// Creates an empty handler slot for the reference.
    pub fn new(reference: Arc<Reference>) -> Self {
        Self { reference, handler: Mutex::new(None) }
    }

    /// Reference of the proxy.
    pub fn reference(&self) -> &Arc<Reference> {
        &self.reference
    }

    /// The currently cached handler.
    pub fn get(&self) -> Option<Arc<dyn RequestHandler>> {
        self.handler.lock().unwrap().clone()
    }

    /// Returns the cached handler or establishes a new one.
    ///
    /// `connect` is called without holding the slot's lock.
    /// The handler it returns is prepared by
    /// [Instance::request_handler](crate::Instance::request_handler).
    /// If another caller cached a handler in the meantime, that handler is
    /// returned and the newly established one is dropped.
    pub async fn get_or_connect<F, Fut, E>(&self, connect: F) -> Result<Arc<dyn RequestHandler>, E>
    where
        F: FnOnce(Arc<Reference>) -> Fut,
        Fut: Future<Output = Result<Arc<dyn RequestHandler>, E>>,
    {
        if self.reference.cache_connection() {
            if let Some(handler) = self.get() {
                return Ok(handler);
            }
        }

        let handler = self.reference.instance().request_handler(connect(self.reference.clone()).await?);

        if !self.reference.cache_connection() {
            return Ok(handler);
        }

        let mut cached = self.handler.lock().unwrap();
        if let Some(current) = cached.as_ref() {
            return Ok(current.clone());
        }

        tracing::debug!(reference = %self.reference, "caching request handler");
        *cached = Some(handler.clone());
        Ok(handler)
    }

    /// Replaces the cached handler after the connection of `previous` changed.
    ///
    /// The cached handler decides by [RequestHandler::update] whether
    /// `previous` is still current.
    /// If `replacement` is `None` and `previous` is current, the slot is cleared.
    pub fn update(&self, previous: &Arc<dyn RequestHandler>, replacement: Option<Arc<dyn RequestHandler>>) {
        if !self.reference.cache_connection() {
            return;
        }

        let mut cached = self.handler.lock().unwrap();
        let Some(current) = cached.take() else { return };

        if let Some(replacement) = &replacement {
            if same_handler(&current, replacement) {
                *cached = Some(current);
                return;
            }
        }

        let next = current.clone().update(previous, replacement);
        match &next {
            Some(next) if same_handler(next, &current) => {
                tracing::trace!(reference = %self.reference, "stale request handler update ignored")
            }
            Some(_) => tracing::debug!(reference = %self.reference, "request handler updated"),
            None => tracing::debug!(reference = %self.reference, "request handler cleared"),
        }
        *cached = next;
    }

    /// Removes the cached handler.
    pub fn clear(&self) {
        self.handler.lock().unwrap().take();
    }
}
