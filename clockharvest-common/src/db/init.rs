//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up
//! idempotently; safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize the database connection pool, creating file and tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure(&pool).await?;
    create_tables(&pool).await?;

    Ok(pool)
}

/// In-memory pool for tests
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    configure(&pool).await?;
    create_tables(&pool).await?;
    Ok(pool)
}

async fn configure(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows the connection log and batch writes to interleave with
    // readers when several devices are harvested concurrently
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;
    Ok(())
}

/// Create all tables (idempotent, safe to call multiple times)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_clocks_table(pool).await?;
    create_connection_log_table(pool).await?;
    create_attendance_marks_table(pool).await?;
    Ok(())
}

/// Registered biometric terminals
async fn create_clocks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clocks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ip TEXT NOT NULL UNIQUE,
            port INTEGER NOT NULL DEFAULT 4370,
            passcode INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            name TEXT,
            location TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// One row per connection attempt against a device
async fn create_connection_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS connection_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ip TEXT NOT NULL,
            available INTEGER NOT NULL,
            observation TEXT NOT NULL,
            logged_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Harvested attendance marks
///
/// The unique index is the dedup key: re-submitting a batch that overlaps a
/// previous run inserts only the new rows, so the reported inserted count can
/// be lower than the submitted count.
async fn create_attendance_marks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance_marks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            site_id INTEGER NOT NULL,
            person TEXT NOT NULL,
            mark_date TEXT NOT NULL,
            mark_time TEXT NOT NULL,
            clock_ip TEXT NOT NULL,
            clock_id INTEGER NOT NULL,
            harvested_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (person, mark_date, mark_time, clock_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
