//! Per-context resources shared by all proxies and handlers.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
};

use crate::{
    executor::QueueExecutor,
    handler::{QueueRequestHandler, RequestHandler},
    Cfg,
};

/// Owning context of references and request handlers.
///
/// The instance owns the [QueueExecutor] used by all
/// [queue request handlers](QueueRequestHandler) created for it.
pub struct Instance {
    cfg: Cfg,
    queue_executor: OnceLock<Arc<QueueExecutor>>,
    destroyed: AtomicBool,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Instance")
            .field("cfg", &self.cfg)
            .field("destroyed", &self.destroyed.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new(Cfg::default())
    }
}

impl Instance {
    /// Creates a new instance.
    ///
    /// # Panics
    /// Panics if the configuration is invalid.
    pub fn new(cfg: Cfg) -> Self {
        cfg.check();
        Self { cfg, queue_executor: OnceLock::new(), destroyed: AtomicBool::new(false) }
    }

    /// The configuration of this instance.
    pub fn cfg(&self) -> &Cfg {
        &self.cfg
    }

    /// Whether request handlers are serialized through the queue executor.
    pub fn queue_requests(&self) -> bool {
        self.cfg.queue_requests
    }

    /// The queue executor of this instance.
    ///
    /// It is created on first use and shared afterwards.
    /// If the instance has been destroyed, the executor accepts no work.
    ///
    /// # Panics
    /// Panics if first called outside of a Tokio runtime.
    pub fn queue_executor(&self) -> Arc<QueueExecutor> {
        let executor = self.queue_executor.get_or_init(|| Arc::new(QueueExecutor::new(&self.cfg))).clone();
        if self.destroyed.load(Ordering::SeqCst) {
            executor.close();
        }
        executor
    }

    /// Prepares a freshly connected handler for use by a proxy.
    ///
    /// The handler is wrapped in a [QueueRequestHandler] if
    /// [queue_requests](Cfg::queue_requests) is enabled.
    pub fn request_handler(&self, handler: Arc<dyn RequestHandler>) -> Arc<dyn RequestHandler> {
        if self.queue_requests() {
            Arc::new(QueueRequestHandler::new(self, handler))
        } else {
            handler
        }
    }

    /// Destroys the instance.
    ///
    /// Shuts down the queue executor after all accepted work has run.
    /// Afterwards queued sends fail with
    /// [CommunicatorDestroyed](crate::LocalError::CommunicatorDestroyed)
    /// and queued cancellations are dropped.
    ///
    /// An executor that has not been used yet is not started.
    pub async fn destroy(&self) {
        tracing::debug!("destroying instance");
        self.destroyed.store(true, Ordering::SeqCst);
        if let Some(executor) = self.queue_executor.get() {
            executor.shutdown().await;
        }
    }

    /// Whether the instance has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}
