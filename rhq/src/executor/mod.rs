//! Serialized execution of units of work.
//!
//! A [QueueExecutor] owns a single lane of execution backed by a Tokio task.
//! Units of work submitted to one executor run one at a time, in submission
//! order, and never concurrently with each other.
//! This makes the executor the only gate protecting the state of the
//! request handlers whose operations are routed through it.
//!
//! Two submission modes are offered:
//!
//!   * [execute](QueueExecutor::execute) propagates the result of the unit of work,
//!     including a [retry signal](crate::RetryError), back to the caller.
//!     A panic inside the unit of work is resumed on the caller.
//!   * [execute_no_throw](QueueExecutor::execute_no_throw) discards all errors
//!     and panics of the unit of work after logging them.
//!
//! Both modes wait until the unit of work has run.
//!
//! A unit of work is accepted once it has entered the queue.
//! While the queue is full, a submission waits for capacity, and dropping
//! its future during that wait withdraws the unit of work.
//! Dropping the future of an accepted submission does not remove the unit of
//! work from the queue; it still runs, but its result is discarded.
//!
//! # Reentrancy
//!
//! A unit of work running on the executor may itself submit to the same executor.
//! Such nested units are executed inline to avoid waiting on the lane that is
//! currently busy running the caller.

use futures::{
    future::{BoxFuture, FutureExt, Shared},
    Future,
};
use std::{
    any::Any,
    error::Error,
    fmt,
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};
use tokio::sync::{mpsc, oneshot};

use crate::{
    error::{LocalError, SendError},
    Cfg,
};

/// A unit of work queued for execution.
type Job = BoxFuture<'static, ()>;

/// Result of a unit of work, or the payload of its panic.
type Outcome<T> = Result<T, Box<dyn Any + Send + 'static>>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    /// Id of the executor whose lane is running the current task.
    static CURRENT_EXECUTOR: u64;
}

/// Submitting to a queue executor failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorError {
    /// The executor has been shut down and accepts no more work.
    ShutDown,
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ShutDown => write!(f, "queue executor has been shut down"),
        }
    }
}

impl Error for ExecutorError {}

impl From<ExecutorError> for LocalError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::ShutDown => Self::CommunicatorDestroyed,
        }
    }
}

impl From<ExecutorError> for SendError {
    fn from(err: ExecutorError) -> Self {
        Self::Local(err.into())
    }
}

/// Runs units of work one at a time in submission order.
///
/// Usually obtained from [Instance::queue_executor](crate::Instance::queue_executor),
/// which shares one executor between all handlers of an instance.
pub struct QueueExecutor {
    id: u64,
    job_tx: mpsc::Sender<Job>,
    close_tx: Mutex<Option<oneshot::Sender<()>>>,
    terminated: Shared<BoxFuture<'static, ()>>,
}

impl fmt::Debug for QueueExecutor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("QueueExecutor").field("id", &self.id).field("shut_down", &self.is_shut_down()).finish()
    }
}

impl QueueExecutor {
    /// Creates a new queue executor and spawns its lane.
    ///
    /// # Panics
    /// Panics if the configuration is invalid or when called outside of a Tokio runtime.
    pub fn new(cfg: &Cfg) -> Self {
        cfg.check();

        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let (job_tx, job_rx) = mpsc::channel(cfg.queue_length);
        let (close_tx, close_rx) = oneshot::channel();
        let worker = tokio::spawn(Self::run(id, job_rx, close_rx));
        tracing::debug!(id, queue_length = cfg.queue_length, "queue executor started");

        let terminated = async move {
            if let Err(err) = worker.await {
                tracing::warn!(id, %err, "queue executor lane failed");
            }
        }
        .boxed()
        .shared();

        Self { id, job_tx, close_tx: Mutex::new(Some(close_tx)), terminated }
    }

    /// Lane executing queued jobs sequentially.
    async fn run(id: u64, mut job_rx: mpsc::Receiver<Job>, mut close_rx: oneshot::Receiver<()>) {
        let mut closing = false;

        loop {
            tokio::select! {
                biased;

                _ = &mut close_rx, if !closing => {
                    // Refuse new jobs but drain the accepted ones.
                    job_rx.close();
                    closing = true;
                }

                job = job_rx.recv() => match job {
                    Some(job) => CURRENT_EXECUTOR.scope(id, job).await,
                    None => break,
                },
            }
        }

        tracing::debug!(id, "queue executor terminated");
    }

    /// Whether the current task is running on this executor's lane.
    fn is_current(&self) -> bool {
        CURRENT_EXECUTOR.try_with(|id| *id == self.id).unwrap_or(false)
    }

    /// Queues the unit of work and waits for its outcome.
    async fn submit<F, Fut, T>(&self, unit: F) -> Result<Outcome<T>, ExecutorError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_current() {
            tracing::trace!(id = self.id, "executing nested unit of work inline");
            return Ok(AssertUnwindSafe(async move { unit().await }).catch_unwind().await);
        }

        if self.is_shut_down() {
            return Err(ExecutorError::ShutDown);
        }

        let (result_tx, result_rx) = oneshot::channel();
        let job = async move {
            let outcome = AssertUnwindSafe(async move { unit().await }).catch_unwind().await;
            let _ = result_tx.send(outcome);
        }
        .boxed();

        self.job_tx.send(job).await.map_err(|_| ExecutorError::ShutDown)?;

        // The job is dropped without running when the lane is aborted.
        result_rx.await.map_err(|_| ExecutorError::ShutDown)
    }

    /// Executes the unit of work on the executor and returns its result.
    ///
    /// A [retry signal](SendError::Retry) or any other error returned by the
    /// unit of work is passed to the caller unchanged.
    /// If the executor has been shut down, [LocalError::CommunicatorDestroyed]
    /// is returned.
    ///
    /// # Panics
    /// If the unit of work panics, the panic is resumed on the caller.
    pub async fn execute<F, Fut, T>(&self, unit: F) -> Result<T, SendError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, SendError>> + Send + 'static,
        T: Send + 'static,
    {
        match self.submit(unit).await? {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }

    /// Executes the unit of work on the executor, discarding any failure.
    ///
    /// Returns the value produced by the unit of work, or `None` if it
    /// returned an error, panicked or the executor has been shut down.
    pub async fn execute_no_throw<F, Fut, T, E>(&self, unit: F) -> Option<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        match self.submit(unit).await {
            Ok(Ok(Ok(value))) => Some(value),
            Ok(Ok(Err(err))) => {
                tracing::debug!(id = self.id, %err, "discarding error of queued unit of work");
                None
            }
            Ok(Err(payload)) => {
                tracing::warn!(id = self.id, panic = panic_message(&*payload), "queued unit of work panicked");
                None
            }
            Err(err) => {
                tracing::debug!(id = self.id, %err, "discarding unit of work");
                None
            }
        }
    }

    /// Stops accepting new units of work without waiting.
    ///
    /// Units of work accepted before still run.
    pub fn close(&self) {
        if let Some(close_tx) = self.close_tx.lock().unwrap().take() {
            tracing::debug!(id = self.id, "shutting down queue executor");
            let _ = close_tx.send(());
        }
    }

    /// Stops accepting new units of work and waits until all accepted
    /// units of work have been executed.
    ///
    /// Every caller waits, including concurrent ones.
    /// When called from a unit of work running on this executor, the lane
    /// is closed but not waited for.
    pub async fn shutdown(&self) {
        self.close();

        if self.is_current() {
            return;
        }

        self.terminated.clone().await;
    }

    /// Returns whether the executor has been shut down.
    pub fn is_shut_down(&self) -> bool {
        self.close_tx.lock().unwrap().is_none() || self.job_tx.is_closed()
    }
}

/// Extracts a printable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic payload"
    }
}
