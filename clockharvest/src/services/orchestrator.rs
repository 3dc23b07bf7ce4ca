//! Harvest orchestration
//!
//! Drives the per-device pipeline end to end and aggregates results across
//! all devices. Per device, terminal on the first applicable branch:
//!
//! 1. Registry lookup — absent/inactive logs a failed attempt and stops.
//! 2. Reachability probes — failure logs a failed attempt and stops.
//! 3. Successful probe is logged.
//! 4. Scoped session: device info (best-effort), raw records, parse, filter,
//!    encode, persist.
//! 5. Session released unconditionally.
//! 6. Connection errors vs. unexpected errors are distinguished; neither
//!    crosses the device boundary.
//!
//! A harvesting run always terminates with exactly one result per device;
//! "total failure" is only the aggregate reading of many independent
//! per-device failures, never a structural abort.

use crate::device::{CapabilityFactory, DeviceEndpoint, ReachabilityProbe};
use crate::services::batch_encoder::encode_batch;
use crate::services::device_session::{DeviceSession, OpenSession, SessionTimeouts};
use crate::services::record_parser::{parse_one, AttendanceMark};
use crate::services::time_window::TimeWindowFilter;
use clockharvest_common::config::Settings;
use clockharvest_common::db::{AttendanceRepository, Clock, ClockRepository};
use clockharvest_common::{Error, Result};
use futures::stream::{self, StreamExt};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Outcome of processing one device in one run
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub clock_ip: String,
    pub success: bool,
    pub marks_processed: u64,
    pub marks_saved: u64,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl ProcessResult {
    fn started(ip: &str) -> Self {
        Self {
            clock_ip: ip.to_string(),
            success: false,
            marks_processed: 0,
            marks_saved: 0,
            error: None,
            elapsed: Duration::ZERO,
        }
    }
}

/// Aggregate view of a harvesting run; a pure reduction owned by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub devices: usize,
    pub succeeded: usize,
    pub marks_processed: u64,
    pub marks_saved: u64,
    pub total_elapsed: Duration,
}

impl RunSummary {
    pub fn from_results(results: &[ProcessResult]) -> Self {
        Self {
            devices: results.len(),
            succeeded: results.iter().filter(|r| r.success).count(),
            marks_processed: results.iter().map(|r| r.marks_processed).sum(),
            marks_saved: results.iter().map(|r| r.marks_saved).sum(),
            total_elapsed: results.iter().map(|r| r.elapsed).sum(),
        }
    }
}

/// Orchestrates harvesting across the registered clocks
pub struct HarvestController {
    settings: Settings,
    clocks: ClockRepository,
    attendance: AttendanceRepository,
    capabilities: Arc<dyn CapabilityFactory>,
    probe: Arc<dyn ReachabilityProbe>,
}

impl HarvestController {
    pub fn new(
        settings: Settings,
        pool: SqlitePool,
        capabilities: Arc<dyn CapabilityFactory>,
        probe: Arc<dyn ReachabilityProbe>,
    ) -> Self {
        Self {
            settings,
            clocks: ClockRepository::new(pool.clone()),
            attendance: AttendanceRepository::new(pool),
            capabilities,
            probe,
        }
    }

    /// Process one device.
    ///
    /// `port` and `passcode` override the registered endpoint when given
    /// (operator-supplied on the command line); registry values apply
    /// otherwise. Never returns an error: every failure mode lands in the
    /// result.
    pub async fn process_device(
        &self,
        ip: &str,
        port: Option<u16>,
        passcode: Option<i64>,
    ) -> ProcessResult {
        let started = Instant::now();
        let mut result = ProcessResult::started(ip);

        match self.process_inner(ip, port, passcode, &mut result).await {
            Ok(()) => {}
            Err(err) if err.is_device_connection() => {
                result.error = Some(err.to_string());
                self.log_connection_quietly(ip, false, &err.to_string()).await;
            }
            Err(err) => {
                error!("Unexpected error processing {}: {}", ip, err);
                result.error = Some(format!("Unexpected error: {}", err));
            }
        }

        result.elapsed = started.elapsed();
        result
    }

    /// Process every active device; exactly one result per device, in
    /// registration order, no matter how many fail.
    pub async fn process_all(&self) -> Result<Vec<ProcessResult>> {
        let clocks = self.clocks.list_active().await?;
        if clocks.is_empty() {
            warn!("No active clocks registered");
            return Ok(Vec::new());
        }

        info!(
            "Processing {} active clocks (concurrency {})",
            clocks.len(),
            self.settings.max_concurrency
        );

        // order-preserving bounded pool; max_concurrency = 1 gives the
        // strictly sequential reference behavior
        let results = stream::iter(clocks)
            .map(|clock| async move { self.process_device(&clock.ip, None, None).await })
            .buffered(self.settings.max_concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(results)
    }

    async fn process_inner(
        &self,
        ip: &str,
        port: Option<u16>,
        passcode: Option<i64>,
        result: &mut ProcessResult,
    ) -> Result<()> {
        // 1. registry lookup; the device is never contacted when it fails
        let Some(clock) = self.clocks.find_active_by_ip(ip).await? else {
            let observation = format!("Clock {} not found or inactive in registry", ip);
            result.error = Some(observation.clone());
            self.attendance.log_connection(ip, false, &observation).await?;
            return Ok(());
        };

        let session = self.session_for(&clock, port, passcode);

        // 2. reachability
        if !session.reachable(self.settings.probe_attempts).await {
            let observation = "No response to reachability probe".to_string();
            result.error = Some(observation.clone());
            self.attendance.log_connection(ip, false, &observation).await?;
            return Ok(());
        }

        // 3. probe success is logged before the session opens
        self.attendance.log_connection(ip, true, "Probe successful").await?;

        // 4./5. scoped session, released on every exit path
        let mut open = session.open().await?;
        let outcome = self.harvest(&clock, &mut open, result).await;
        open.close().await;
        outcome
    }

    async fn harvest(
        &self,
        clock: &Clock,
        open: &mut OpenSession,
        result: &mut ProcessResult,
    ) -> Result<()> {
        let info = open.device_info().await;
        let raw = open.raw_records().await;

        if raw.is_empty() {
            result.success = true;
            return Ok(());
        }

        let filter = TimeWindowFilter::new(self.settings.window_days);
        let marks: Vec<AttendanceMark> = raw
            .iter()
            .filter_map(|record| parse_one(record, &info.ip, clock.id))
            .filter(|mark| filter.accepts(&mark.date))
            .collect();

        result.marks_processed = marks.len() as u64;
        info!("Marks accepted from {}: {} of {} raw", clock.ip, marks.len(), raw.len());

        if !marks.is_empty() {
            let payload = encode_batch(&marks)?;
            let persist = Duration::from_millis(self.settings.persist_timeout_ms);
            let saved = tokio::time::timeout(
                persist,
                self.attendance.save_batch(self.settings.site_id, &payload),
            )
            .await
            .map_err(|_| Error::Timeout(format!("persisting batch from {}", clock.ip)))??;
            result.marks_saved = saved;
        }

        result.success = true;
        Ok(())
    }

    fn session_for(&self, clock: &Clock, port: Option<u16>, passcode: Option<i64>) -> DeviceSession {
        // the clocks.port column is an unconstrained INTEGER; a row edited
        // outside the CLI may hold a value no endpoint can use
        let registered_port = u16::try_from(clock.port).unwrap_or_else(|_| {
            warn!(
                "Registered port {} for {} out of range, using default {}",
                clock.port, clock.ip, self.settings.default_port
            );
            self.settings.default_port
        });
        let endpoint = DeviceEndpoint {
            ip: clock.ip.clone(),
            port: port.unwrap_or(registered_port),
            passcode: passcode.unwrap_or(clock.passcode),
        };
        let capability = self.capabilities.capability_for(&endpoint);
        DeviceSession::new(
            endpoint,
            capability,
            self.probe.clone(),
            SessionTimeouts::from_settings(&self.settings),
        )
    }

    /// Connection-attempt logging on an already-failing path must not mask
    /// the original failure
    async fn log_connection_quietly(&self, ip: &str, available: bool, observation: &str) {
        if let Err(e) = self.attendance.log_connection(ip, available, observation).await {
            error!("Could not record connection attempt for {}: {}", ip, e);
        }
    }
}
