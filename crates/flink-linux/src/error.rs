//! Error types for Linux flink operations

use thiserror::Error;

/// Linux flink specific errors
#[derive(Debug, Error)]
pub enum LinuxFlinkError {
    /// Failed to open device
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Device file is already open in this process
    #[error("{path} is already open")]
    AlreadyOpen { path: String },

    /// No device path specified
    #[error("No device specified. Use dev=/dev/flinkN")]
    NoDevice,

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// Driver request failed
    #[error("{request} failed: {source}")]
    Ioctl {
        request: &'static str,
        #[source]
        source: nix::errno::Errno,
    },
}

/// Result type for Linux flink operations
pub type Result<T> = std::result::Result<T, LinuxFlinkError>;
