//! Addressing information of remote objects.

use std::{fmt, sync::Arc};

use crate::Instance;

/// How a request is delivered to the remote object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InvocationMode {
    /// Request with reply.
    #[default]
    Twoway,
    /// Request without reply.
    Oneway,
    /// Request without reply, buffered until flushed.
    BatchOneway,
    /// Unreliable request without reply.
    Datagram,
    /// Unreliable request without reply, buffered until flushed.
    BatchDatagram,
}

impl InvocationMode {
    /// Whether the remote endpoint sends a reply.
    pub fn expects_response(self) -> bool {
        matches!(self, Self::Twoway)
    }

    /// Whether requests are buffered until flushed.
    pub fn is_batch(self) -> bool {
        matches!(self, Self::BatchOneway | Self::BatchDatagram)
    }
}

/// Immutable description of where and how to reach a remote object.
///
/// Owned by a proxy; request handlers hold a shared, read-only reference to it.
#[derive(Clone)]
pub struct Reference {
    instance: Arc<Instance>,
    identity: String,
    facet: String,
    mode: InvocationMode,
    endpoints: Vec<String>,
    adapter_id: String,
    compress: bool,
    cache_connection: bool,
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Reference")
            .field("identity", &self.identity)
            .field("facet", &self.facet)
            .field("mode", &self.mode)
            .field("endpoints", &self.endpoints)
            .field("adapter_id", &self.adapter_id)
            .field("compress", &self.compress)
            .field("cache_connection", &self.cache_connection)
            .finish()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.identity)?;
        if !self.facet.is_empty() {
            write!(f, " -f {}", self.facet)?;
        }
        if !self.adapter_id.is_empty() {
            write!(f, " @ {}", self.adapter_id)?;
        }
        for endpoint in &self.endpoints {
            write!(f, ":{}", endpoint)?;
        }
        Ok(())
    }
}

impl Reference {
    /// Creates a two-way reference to the object with the specified identity.
    ///
    /// Connection caching is enabled and compression is disabled.
    pub fn new(instance: Arc<Instance>, identity: impl Into<String>) -> Self {
        Self {
            instance,
            identity: identity.into(),
            facet: String::new(),
            mode: InvocationMode::default(),
            endpoints: Vec::new(),
            adapter_id: String::new(),
            compress: false,
            cache_connection: true,
        }
    }

    /// Sets the facet.
    pub fn with_facet(mut self, facet: impl Into<String>) -> Self {
        self.facet = facet.into();
        self
    }

    /// Sets the invocation mode.
    pub fn with_mode(mut self, mode: InvocationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Adds an endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    /// Sets the object adapter id used for indirect binding.
    pub fn with_adapter_id(mut self, adapter_id: impl Into<String>) -> Self {
        self.adapter_id = adapter_id.into();
        self
    }

    /// Sets whether request payloads are compressed.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Sets whether proxies cache their request handler.
    pub fn with_cache_connection(mut self, cache_connection: bool) -> Self {
        self.cache_connection = cache_connection;
        self
    }

    /// The owning instance.
    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    /// Identity of the remote object.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Facet of the remote object.
    pub fn facet(&self) -> &str {
        &self.facet
    }

    /// Invocation mode.
    pub fn mode(&self) -> InvocationMode {
        self.mode
    }

    /// Endpoints of the remote object.
    ///
    /// Empty for indirect references.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Object adapter id.
    pub fn adapter_id(&self) -> &str {
        &self.adapter_id
    }

    /// Whether request payloads are compressed.
    pub fn compress(&self) -> bool {
        self.compress
    }

    /// Whether proxies cache their request handler.
    pub fn cache_connection(&self) -> bool {
        self.cache_connection
    }
}
