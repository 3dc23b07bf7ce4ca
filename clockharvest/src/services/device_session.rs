//! Per-device session lifecycle
//!
//! Wraps the opaque device capability with reachability probing, a scoped
//! connection guard, and the degrade-don't-abort policy for non-critical
//! queries: metadata failures fall back to ip-only info, record-fetch
//! failures degrade to zero records. Every capability call carries an
//! enforced timeout, so one dead device costs at most its own bound.

use crate::device::{
    DeviceCapability, DeviceConnection, DeviceEndpoint, DeviceError, DeviceInfo, RawRecord,
    ReachabilityProbe,
};
use clockharvest_common::config::Settings;
use clockharvest_common::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Timeouts applied to the individual session operations
#[derive(Debug, Clone, Copy)]
pub struct SessionTimeouts {
    pub probe: Duration,
    pub connect: Duration,
    pub fetch: Duration,
}

impl SessionTimeouts {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            probe: Duration::from_millis(settings.probe_timeout_ms),
            connect: Duration::from_millis(settings.connect_timeout_ms),
            fetch: Duration::from_millis(settings.fetch_timeout_ms),
        }
    }
}

/// Manages probing and a scoped connection to one terminal
pub struct DeviceSession {
    endpoint: DeviceEndpoint,
    capability: Arc<dyn DeviceCapability>,
    probe: Arc<dyn ReachabilityProbe>,
    timeouts: SessionTimeouts,
}

impl DeviceSession {
    pub fn new(
        endpoint: DeviceEndpoint,
        capability: Arc<dyn DeviceCapability>,
        probe: Arc<dyn ReachabilityProbe>,
        timeouts: SessionTimeouts,
    ) -> Self {
        Self {
            endpoint,
            capability,
            probe,
            timeouts,
        }
    }

    pub fn ip(&self) -> &str {
        &self.endpoint.ip
    }

    /// Issue `attempts` independent probes; true if any succeeds
    pub async fn reachable(&self, attempts: u32) -> bool {
        for attempt in 1..=attempts {
            if self
                .probe
                .probe(&self.endpoint.ip, self.endpoint.port, self.timeouts.probe)
                .await
            {
                info!("Probe to {}: OK (attempt {}/{})", self.endpoint.ip, attempt, attempts);
                return true;
            }
            debug!("Probe {}/{} to {} failed", attempt, attempts, self.endpoint.ip);
        }
        info!("Probe to {}: FAILED after {} attempts", self.endpoint.ip, attempts);
        false
    }

    /// Acquire a connection to the device.
    ///
    /// Failure surfaces as `Error::DeviceConnection` wrapping the cause. The
    /// returned guard must be released with [`OpenSession::close`]; dropping
    /// it unclosed logs a warning.
    pub async fn open(&self) -> Result<OpenSession> {
        info!("Connecting to {}:{}...", self.endpoint.ip, self.endpoint.port);

        let conn = match tokio::time::timeout(self.timeouts.connect, self.capability.connect()).await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(source)) => {
                error!("Error connecting to {}: {}", self.endpoint.ip, source);
                return Err(self.connection_error(source));
            }
            Err(_) => {
                let source = DeviceError::Timeout(self.timeouts.connect.as_millis() as u64);
                error!("Error connecting to {}: {}", self.endpoint.ip, source);
                return Err(self.connection_error(source));
            }
        };

        info!("Connected to {}", self.endpoint.ip);
        Ok(OpenSession {
            ip: self.endpoint.ip.clone(),
            fetch_timeout: self.timeouts.fetch,
            conn: Some(conn),
        })
    }

    fn connection_error(&self, source: DeviceError) -> Error {
        Error::DeviceConnection {
            ip: self.endpoint.ip.clone(),
            port: self.endpoint.port,
            source: Box::new(source),
        }
    }
}

/// Scoped connection guard.
///
/// Queries degrade rather than escalate: device metadata is non-critical and
/// a failed record fetch means "zero marks", not an aborted device.
pub struct OpenSession {
    ip: String,
    fetch_timeout: Duration,
    conn: Option<Box<dyn DeviceConnection>>,
}

impl OpenSession {
    /// Best-effort device metadata; any failure yields ip-only info
    pub async fn device_info(&mut self) -> DeviceInfo {
        let ip = self.ip.clone();
        let Some(conn) = self.conn.as_mut() else {
            return DeviceInfo::ip_only(&ip);
        };

        match tokio::time::timeout(self.fetch_timeout, conn.network_params()).await {
            Ok(Ok(mut info)) => {
                // the session's ip is authoritative; firmware sometimes
                // reports a stale address after DHCP reassignment
                info.ip = ip;
                info
            }
            Ok(Err(e)) => {
                warn!("Could not fetch device info from {}: {}", ip, e);
                DeviceInfo::ip_only(&ip)
            }
            Err(_) => {
                warn!("Device info query to {} timed out", ip);
                DeviceInfo::ip_only(&ip)
            }
        }
    }

    /// Fetch raw records; failure logs and degrades to an empty sequence
    pub async fn raw_records(&mut self) -> Vec<RawRecord> {
        let ip = self.ip.clone();
        let Some(conn) = self.conn.as_mut() else {
            return Vec::new();
        };

        info!("Fetching marks from {}...", ip);
        match tokio::time::timeout(self.fetch_timeout, conn.read_attendance()).await {
            Ok(Ok(records)) => {
                info!("Marks fetched from {}: {}", ip, records.len());
                records
            }
            Ok(Err(e)) => {
                error!("Error fetching marks from {}: {}", ip, e);
                Vec::new()
            }
            Err(_) => {
                error!("Fetching marks from {} timed out", ip);
                Vec::new()
            }
        }
    }

    /// Release the device link; failures are logged, never escalated
    pub async fn close(mut self) {
        if let Some(mut conn) = self.conn.take() {
            match tokio::time::timeout(self.fetch_timeout, conn.disconnect()).await {
                Ok(Ok(())) => debug!("Disconnected from {}", self.ip),
                Ok(Err(e)) => debug!("Disconnect from {} failed: {}", self.ip, e),
                Err(_) => debug!("Disconnect from {} timed out", self.ip),
            }
        }
    }
}

impl Drop for OpenSession {
    fn drop(&mut self) {
        if self.conn.is_some() {
            warn!("Session to {} dropped without close; link released by peer", self.ip);
        }
    }
}
