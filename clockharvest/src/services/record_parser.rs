//! Raw-record parsing
//!
//! Terminals report attendance events as whitespace-separated token lines:
//!
//! ```text
//! Attendance <person> : <YYYY-MM-DD> <HH:MM:SS> <status>
//! ```
//!
//! Firmware variants garble records routinely, so a record that does not fit
//! is dropped with a warning, never escalated. Parsing is pure: identical
//! input always yields the identical mark, or always `None`.

use crate::device::RawRecord;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::warn;

/// Canonical attendance mark, immutable once constructed.
///
/// Date and time stay textual exactly as extracted from the record; they are
/// validated, not normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceMark {
    pub person: String,
    pub date: String,
    pub time: String,
    pub clock_ip: String,
    pub clock_id: i64,
}

/// Parse one raw record into a canonical mark, or discard it.
///
/// Token positions: `[1]` person id, `[3]` date, `[4]` time. Fewer than five
/// tokens or a non-parseable date/time drops the record.
pub fn parse_one(raw: &RawRecord, clock_ip: &str, clock_id: i64) -> Option<AttendanceMark> {
    let text = raw.as_str();
    let tokens: Vec<&str> = text.split_whitespace().collect();

    if tokens.len() < 5 {
        warn!("Malformed raw record from {}: {:?}", clock_ip, text);
        return None;
    }

    let person = tokens[1];
    let date = tokens[3];
    let time = tokens[4];

    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        warn!("Invalid date in raw record from {}: {:?}", clock_ip, date);
        return None;
    }
    if NaiveTime::parse_from_str(time, "%H:%M:%S").is_err() {
        warn!("Invalid time in raw record from {}: {:?}", clock_ip, time);
        return None;
    }

    Some(AttendanceMark {
        person: person.to_string(),
        date: date.to_string(),
        time: time.to_string(),
        clock_ip: clock_ip.to_string(),
        clock_id,
    })
}
