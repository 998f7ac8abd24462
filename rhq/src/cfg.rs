//! Instance configuration.

/// Instance configuration.
///
/// In most cases the default configuration ([Cfg::default]) is fine and should be used.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cfg {
    /// Whether request handlers created by the instance are wrapped in a
    /// [QueueRequestHandler](crate::handler::QueueRequestHandler).
    ///
    /// When enabled all sends and cancellations of a handler are executed
    /// one at a time on the instance's [QueueExecutor](crate::executor::QueueExecutor).
    /// By default this is true.
    pub queue_requests: bool,
    /// Number of units of work that can be waiting for execution on
    /// the queue executor.
    ///
    /// Submitters wait when the queue is full.
    /// By default this is 1024.
    /// This must not be zero.
    pub queue_length: usize,
    #[doc(hidden)]
    #[cfg_attr(feature = "serde", serde(skip))]
    pub _non_exhaustive: (),
}

impl Default for Cfg {
    fn default() -> Self {
        Self { queue_requests: true, queue_length: 1024, _non_exhaustive: () }
    }
}

impl Cfg {
    /// Checks the configuration.
    ///
    /// # Panics
    /// Panics if the configuration is invalid.
    pub(crate) fn check(&self) {
        if self.queue_length == 0 {
            panic!("queue length must not be zero");
        }
    }
}
