//! Adapter Error Types

use thiserror::Error;

/// Errors raised while turning a capability command into vendor requests
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    /// Command value outside its domain (NaN threshold, unparseable text)
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Overlay text could not be put on the wire; the overlay is left unchanged
    #[error("Cannot encode overlay text {text:?}: {reason}")]
    EncodingFailure { text: String, reason: String },

    /// Channel id not known to the capability model
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// Response kind name not known to the capability model
    #[error("Unknown response kind: {0}")]
    UnknownResponseKind(String),
}
