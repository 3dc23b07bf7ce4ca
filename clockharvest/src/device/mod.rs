//! Device capability seam
//!
//! The wire-level terminal protocol is deliberately kept behind the
//! `DeviceCapability` / `DeviceConnection` traits: the rest of the pipeline
//! only sees opaque textual raw records and best-effort metadata, so a
//! different terminal firmware or vendor driver slots in without touching
//! parsing, filtering, or persistence.

pub mod probe;
pub mod terminal;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use probe::{ReachabilityProbe, TcpProbe};
pub use terminal::{TerminalCapability, TerminalCapabilityFactory};

/// Capability-level errors
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Could not establish a connection to the terminal
    #[error("connect failed: {0}")]
    Connect(String),

    /// Terminal replied with something the driver cannot interpret
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Operation exceeded its enforced timeout
    #[error("operation timed out after {0} ms")]
    Timeout(u64),

    /// Transport-level I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One opaque attendance event as reported by a device, before parsing.
///
/// The textual representation is the contract: a whitespace-separated token
/// sequence interpreted positionally by the record parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord(String);

impl RawRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Best-effort device metadata; only `ip` is guaranteed to be populated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub ip: String,
    pub mac: String,
    pub serial: String,
    pub platform: String,
}

impl DeviceInfo {
    /// Metadata fallback when the device refuses or garbles the query
    pub fn ip_only(ip: &str) -> Self {
        Self {
            ip: ip.to_string(),
            ..Self::default()
        }
    }
}

/// Network endpoint and credentials of one terminal
#[derive(Debug, Clone)]
pub struct DeviceEndpoint {
    pub ip: String,
    pub port: u16,
    pub passcode: i64,
}

/// An established connection to a terminal.
///
/// Implementations own the transport; `disconnect` releases it. Queries may
/// fail at any time (terminals are flaky); callers decide how to degrade.
#[async_trait]
pub trait DeviceConnection: Send {
    /// Query network parameters / identity of the device
    async fn network_params(&mut self) -> Result<DeviceInfo, DeviceError>;

    /// Enumerate the raw attendance records currently held by the device
    async fn read_attendance(&mut self) -> Result<Vec<RawRecord>, DeviceError>;

    /// Release the device link
    async fn disconnect(&mut self) -> Result<(), DeviceError>;
}

/// Entry point of the device protocol implementation
#[async_trait]
pub trait DeviceCapability: Send + Sync {
    /// Establish a connection to the terminal
    async fn connect(&self) -> Result<Box<dyn DeviceConnection>, DeviceError>;
}

/// Builds a capability for a given endpoint.
///
/// The orchestrator resolves endpoints from the clock registry at run time,
/// so capability construction has to be late-bound.
pub trait CapabilityFactory: Send + Sync {
    fn capability_for(&self, endpoint: &DeviceEndpoint) -> Arc<dyn DeviceCapability>;
}
