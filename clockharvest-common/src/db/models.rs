//! Database models

use serde::{Deserialize, Serialize};

/// Registered biometric terminal
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Clock {
    pub id: i64,
    pub ip: String,
    pub port: i64,
    pub passcode: i64,
    pub active: bool,
    pub name: Option<String>,
    pub location: Option<String>,
}

/// One connection attempt against a device
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConnectionLogEntry {
    pub id: i64,
    pub ip: String,
    pub available: bool,
    pub observation: String,
    pub logged_at: String,
}

/// One entry of the serialized batch payload.
///
/// Field order is the wire order: serde serializes struct fields in
/// declaration order, which is what makes the payload deterministic.
/// Identical inputs always produce byte-identical payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub person: String,
    pub date: String,
    pub time: String,
    pub clock_ip: String,
    pub clock_id: i64,
}
