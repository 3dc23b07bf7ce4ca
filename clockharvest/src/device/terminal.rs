//! Text-line terminal driver
//!
//! Default `DeviceCapability` implementation speaking the line-oriented TCP
//! dialect of the attendance terminal gateways:
//!
//! ```text
//! -> HELLO <passcode>
//! <- OK <banner...>
//! -> INFO
//! <- INFO <ip> <mac> <serial> <platform>
//! -> ATTLOG
//! <- ATTLOG <count>
//! <- <raw record line> (count times)
//! -> BYE
//! ```
//!
//! Raw record lines pass through untouched; their shape is the record
//! parser's business, not the driver's.

use super::{DeviceCapability, DeviceConnection, DeviceEndpoint, DeviceError, DeviceInfo, RawRecord};
use crate::device::CapabilityFactory;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

/// Upper bound on records accepted from one ATTLOG reply; terminals hold a
/// few thousand punches at most
const MAX_ATTLOG_RECORDS: usize = 100_000;

/// Driver for one terminal endpoint
pub struct TerminalCapability {
    endpoint: DeviceEndpoint,
    connect_timeout: Duration,
}

impl TerminalCapability {
    pub fn new(endpoint: DeviceEndpoint, connect_timeout: Duration) -> Self {
        Self {
            endpoint,
            connect_timeout,
        }
    }
}

#[async_trait]
impl DeviceCapability for TerminalCapability {
    async fn connect(&self) -> Result<Box<dyn DeviceConnection>, DeviceError> {
        let addr = format!("{}:{}", self.endpoint.ip, self.endpoint.port);

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| DeviceError::Timeout(self.connect_timeout.as_millis() as u64))?
            .map_err(|e| DeviceError::Connect(format!("{}: {}", addr, e)))?;

        let (read_half, write_half) = stream.into_split();
        let mut conn = TerminalConnection {
            reader: BufReader::new(read_half),
            writer: write_half,
        };

        conn.send_line(&format!("HELLO {}", self.endpoint.passcode)).await?;
        let reply = conn.read_line().await?;
        if !reply.starts_with("OK") {
            return Err(DeviceError::Connect(format!(
                "{}: handshake refused: {}",
                addr, reply
            )));
        }

        debug!("Terminal handshake complete: {}", addr);
        Ok(Box::new(conn))
    }
}

struct TerminalConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TerminalConnection {
    async fn send_line(&mut self, line: &str) -> Result<(), DeviceError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, DeviceError> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(DeviceError::Protocol("connection closed by terminal".into()));
        }
        Ok(line.trim_end().to_string())
    }
}

#[async_trait]
impl DeviceConnection for TerminalConnection {
    async fn network_params(&mut self) -> Result<DeviceInfo, DeviceError> {
        self.send_line("INFO").await?;
        let reply = self.read_line().await?;

        let mut tokens = reply.split_whitespace();
        if tokens.next() != Some("INFO") {
            return Err(DeviceError::Protocol(format!("unexpected INFO reply: {}", reply)));
        }
        Ok(DeviceInfo {
            ip: tokens.next().unwrap_or_default().to_string(),
            mac: tokens.next().unwrap_or_default().to_string(),
            serial: tokens.next().unwrap_or_default().to_string(),
            platform: tokens.next().unwrap_or_default().to_string(),
        })
    }

    async fn read_attendance(&mut self) -> Result<Vec<RawRecord>, DeviceError> {
        self.send_line("ATTLOG").await?;
        let header = self.read_line().await?;

        let count: usize = header
            .strip_prefix("ATTLOG ")
            .and_then(|c| c.trim().parse().ok())
            .ok_or_else(|| DeviceError::Protocol(format!("unexpected ATTLOG reply: {}", header)))?;

        // the header count is device-supplied and firmware garbles it like
        // anything else; an implausible value must not drive allocation
        if count > MAX_ATTLOG_RECORDS {
            return Err(DeviceError::Protocol(format!(
                "implausible ATTLOG count: {}",
                count
            )));
        }

        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            records.push(RawRecord::new(self.read_line().await?));
        }
        Ok(records)
    }

    async fn disconnect(&mut self) -> Result<(), DeviceError> {
        // best effort; the terminal drops the link either way
        let _ = self.send_line("BYE").await;
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Builds `TerminalCapability` instances for registry-resolved endpoints
pub struct TerminalCapabilityFactory {
    connect_timeout: Duration,
}

impl TerminalCapabilityFactory {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl CapabilityFactory for TerminalCapabilityFactory {
    fn capability_for(&self, endpoint: &DeviceEndpoint) -> Arc<dyn DeviceCapability> {
        Arc::new(TerminalCapability::new(endpoint.clone(), self.connect_timeout))
    }
}
