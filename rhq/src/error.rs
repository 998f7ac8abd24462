//! Errors raised while delivering requests.

use std::{error::Error, fmt};

/// The current handler can no longer deliver the request.
///
/// This is recoverable: the caller must obtain a new request handler,
/// for example by [updating](crate::handler::HandlerCache::update) its
/// handler slot, and resubmit the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RetryError;

impl fmt::Display for RetryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "request must be retried with a new handler")
    }
}

impl Error for RetryError {}

/// A local failure that is not recoverable by retrying with a new handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocalError {
    /// The connection used by the handler was lost.
    ConnectionLost(String),
    /// The invocation timed out.
    Timeout,
    /// The invocation was canceled by the caller.
    Canceled,
    /// The instance owning the handler has been destroyed.
    CommunicatorDestroyed,
    /// Any other local failure reported by a transport.
    Other(String),
}

impl fmt::Display for LocalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "connection lost: {}", msg),
            Self::Timeout => write!(f, "invocation timed out"),
            Self::Canceled => write!(f, "invocation canceled"),
            Self::CommunicatorDestroyed => write!(f, "communicator destroyed"),
            Self::Other(msg) => write!(f, "local error: {}", msg),
        }
    }
}

impl Error for LocalError {}

/// Sending a request through a handler failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SendError {
    /// The caller must pick a new handler and resubmit.
    Retry(RetryError),
    /// Sending failed fatally.
    Local(LocalError),
}

impl SendError {
    /// Returns whether the caller should retry with a new handler.
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Retry(err) => write!(f, "{}", err),
            Self::Local(err) => write!(f, "send failed: {}", err),
        }
    }
}

impl Error for SendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Retry(err) => Some(err),
            Self::Local(err) => Some(err),
        }
    }
}

impl From<RetryError> for SendError {
    fn from(err: RetryError) -> Self {
        Self::Retry(err)
    }
}

impl From<LocalError> for SendError {
    fn from(err: LocalError) -> Self {
        Self::Local(err)
    }
}
