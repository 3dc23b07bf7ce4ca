//! Common error types for clockharvest

use thiserror::Error;

/// Common result type for clockharvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the harvester
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to acquire a connection to a biometric terminal.
    ///
    /// Scoped to a single device: the orchestrator converts this into a
    /// failed per-device result and keeps going.
    #[error("Device connection failed ({ip}:{port}): {source}")]
    DeviceConnection {
        ip: String,
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Batch payload could not be encoded or decoded
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// An enforced timeout elapsed
    #[error("Timed out: {0}")]
    Timeout(String),
}

impl Error {
    /// True when the error is a per-device connection failure
    pub fn is_device_connection(&self) -> bool {
        matches!(self, Error::DeviceConnection { .. })
    }
}
