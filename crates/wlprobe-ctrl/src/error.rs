use thiserror::Error;

/// Error type for control-interface operations.
///
/// Callers retry on `RequestTimeout` and give up on the rest.
#[derive(Error, Debug)]
pub enum CtrlError {
    #[error("Failed to connect to control socket {path}: {reason}")]
    Connect { path: String, reason: String },

    #[error("Request '{command}' failed: {reason}")]
    RequestFailed { command: String, reason: String },

    #[error("Request '{command}' timed out after {timeout_ms}ms")]
    RequestTimeout { command: String, timeout_ms: u64 },

    #[error("Unexpected reply to '{command}': {response}")]
    Protocol { command: String, response: String },

    #[error("IO error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CtrlError>;

impl CtrlError {
    /// Create an IO error with context
    pub fn io_error(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CtrlError::RequestTimeout { .. })
    }
}
