//! Repositories over the harvest database
//!
//! `ClockRepository` answers registry lookups; `AttendanceRepository` records
//! connection attempts and lands batch payloads. Both hold a pool clone and
//! are cheap to clone themselves.

use crate::db::models::{BatchEntry, Clock};
use crate::Result;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

/// Connection-attempt observations are capped at this many characters
const MAX_OBSERVATION_LEN: usize = 255;

/// Registry of biometric terminals
#[derive(Clone)]
pub struct ClockRepository {
    pool: SqlitePool,
}

impl ClockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up an active clock by IP; inactive or unknown clocks yield `None`
    pub async fn find_active_by_ip(&self, ip: &str) -> Result<Option<Clock>> {
        let clock = sqlx::query_as::<_, Clock>(
            "SELECT id, ip, port, passcode, active, name, location
             FROM clocks WHERE active = 1 AND ip = ?",
        )
        .bind(ip)
        .fetch_optional(&self.pool)
        .await?;

        if clock.is_none() {
            warn!("Clock not registered or inactive: {}", ip);
        }
        Ok(clock)
    }

    /// All active clocks, in registration order
    pub async fn list_active(&self) -> Result<Vec<Clock>> {
        let clocks = sqlx::query_as::<_, Clock>(
            "SELECT id, ip, port, passcode, active, name, location
             FROM clocks WHERE active = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Active clocks found: {}", clocks.len());
        Ok(clocks)
    }

    /// Register a clock or update its endpoint data; returns the row id
    pub async fn upsert(
        &self,
        ip: &str,
        port: u16,
        passcode: i64,
        name: Option<&str>,
        location: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO clocks (ip, port, passcode, active, name, location)
             VALUES (?, ?, ?, 1, ?, ?)
             ON CONFLICT(ip) DO UPDATE SET
                 port = excluded.port,
                 passcode = excluded.passcode,
                 name = COALESCE(excluded.name, clocks.name),
                 location = COALESCE(excluded.location, clocks.location)",
        )
        .bind(ip)
        .bind(port as i64)
        .bind(passcode)
        .bind(name)
        .bind(location)
        .execute(&self.pool)
        .await?;

        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM clocks WHERE ip = ?")
            .bind(ip)
            .fetch_one(&self.pool)
            .await?;

        debug!("Upserted clock {} (rows affected: {})", ip, result.rows_affected());
        Ok(id)
    }

    /// Flip a clock's active flag; returns false when the IP is unknown
    pub async fn set_active(&self, ip: &str, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE clocks SET active = ? WHERE ip = ?")
            .bind(active)
            .bind(ip)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Persistence gateway for attendance data
#[derive(Clone)]
pub struct AttendanceRepository {
    pool: SqlitePool,
}

impl AttendanceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a connection attempt against a device.
    ///
    /// The observation is truncated to 255 characters on a char boundary.
    pub async fn log_connection(&self, ip: &str, available: bool, observation: &str) -> Result<()> {
        let observation: String = observation.chars().take(MAX_OBSERVATION_LEN).collect();

        sqlx::query("INSERT INTO connection_log (ip, available, observation) VALUES (?, ?, ?)")
            .bind(ip)
            .bind(available)
            .bind(&observation)
            .execute(&self.pool)
            .await?;

        debug!("Connection log: {} - {}", ip, if available { "OK" } else { "FAIL" });
        Ok(())
    }

    /// Land a batch payload, returning how many rows were actually inserted.
    ///
    /// Marks already present (same person/date/time/clock) are ignored, so
    /// the returned count may be lower than the number of submitted entries.
    /// All entries of one batch land in a single transaction.
    pub async fn save_batch(&self, site_id: i64, payload: &str) -> Result<u64> {
        let entries: Vec<BatchEntry> = serde_json::from_str(payload)?;

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for entry in &entries {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO attendance_marks
                     (site_id, person, mark_date, mark_time, clock_ip, clock_id)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(site_id)
            .bind(&entry.person)
            .bind(&entry.date)
            .bind(&entry.time)
            .bind(&entry.clock_ip)
            .bind(entry.clock_id)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;

        info!("Marks saved: {} new of {} submitted", inserted, entries.len());
        Ok(inserted)
    }
}
