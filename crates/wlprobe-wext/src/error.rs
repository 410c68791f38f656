use thiserror::Error;

/// Error type for wireless-extensions scanning.
///
/// Decoding never fails: truncated or malformed scan data is absorbed into
/// partial records. Only device and scan-retrieval problems surface here.
#[derive(Error, Debug)]
pub enum WextError {
    #[error("Interface '{name}' not found. Verify interface exists with 'ip link show'.")]
    InterfaceNotFound { name: String },

    #[error("Interface '{name}' has no wireless extensions: {reason}")]
    NotWireless { name: String, reason: String },

    #[error("Interface '{interface}' doesn't support scanning: {reason}")]
    ScanUnsupported { interface: String, reason: String },

    #[error("Unable to read scan data from '{interface}': {reason}")]
    ScanRead { interface: String, reason: String },

    #[error("Scan on '{interface}' produced no results within {budget_ms}ms")]
    ScanTimeout { interface: String, budget_ms: u64 },

    #[error("Scan data on '{interface}' needs {required} bytes, above the {limit} byte limit")]
    ScanBufferLimit {
        interface: String,
        required: usize,
        limit: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Permission denied: {operation}. Root privileges required.")]
    PermissionDenied { operation: String },

    #[error("IO error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, WextError>;

impl WextError {
    /// Create an IO error with context
    pub fn io_error(operation: impl Into<String>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied {
                operation: operation.into(),
            };
        }
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}
