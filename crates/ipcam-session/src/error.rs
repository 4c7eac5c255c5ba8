//! Session Error Types

use ipcam_protocol::AdapterError;
use thiserror::Error;

/// Errors that can occur while driving a camera session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Command rejected before any request was built
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Transport failed to deliver the request or its reply
    #[error("Transport error: {0}")]
    Transport(String),

    /// No reply within the response timeout
    #[error("Timeout waiting for camera response after {0}ms")]
    Timeout(u64),

    /// Reply does not belong to the request currently awaited
    #[error("Stale response for request {seq} (awaiting {awaiting:?})")]
    StaleResponse { seq: u64, awaiting: Option<u64> },
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Transport(err.to_string())
    }
}
