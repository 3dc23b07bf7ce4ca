//! Batch payload encoding
//!
//! Serializes accepted marks into the payload submitted to persistence: a
//! JSON array whose entries carry exactly five fields in declaration order.
//! Identical inputs produce byte-identical payloads, which keeps harvest
//! runs reproducible and testable.

use crate::services::record_parser::AttendanceMark;
use clockharvest_common::db::BatchEntry;
use clockharvest_common::Result;

/// Encode accepted marks into the deterministic batch payload
pub fn encode_batch(marks: &[AttendanceMark]) -> Result<String> {
    let entries: Vec<BatchEntry> = marks
        .iter()
        .map(|mark| BatchEntry {
            person: mark.person.clone(),
            date: mark.date.clone(),
            time: mark.time.clone(),
            clock_ip: mark.clock_ip.clone(),
            clock_id: mark.clock_id,
        })
        .collect();

    Ok(serde_json::to_string(&entries)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RawRecord;
    use crate::services::record_parser::parse_one;

    fn sample_mark() -> AttendanceMark {
        AttendanceMark {
            person: "7788".into(),
            date: "2024-05-01".into(),
            time: "08:15:00".into(),
            clock_ip: "10.0.0.1".into(),
            clock_id: 42,
        }
    }

    #[test]
    fn identical_input_gives_byte_identical_payload() {
        let marks = vec![sample_mark(), sample_mark()];
        let first = encode_batch(&marks).unwrap();
        let second = encode_batch(&marks).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn field_order_is_stable() {
        let payload = encode_batch(&[sample_mark()]).unwrap();
        let person = payload.find("\"person\"").unwrap();
        let date = payload.find("\"date\"").unwrap();
        let time = payload.find("\"time\"").unwrap();
        let clock_ip = payload.find("\"clock_ip\"").unwrap();
        let clock_id = payload.find("\"clock_id\"").unwrap();
        assert!(person < date && date < time && time < clock_ip && clock_ip < clock_id);
    }

    #[test]
    fn empty_batch_is_empty_array() {
        assert_eq!(encode_batch(&[]).unwrap(), "[]");
    }

    #[test]
    fn round_trip_preserves_extracted_fields() {
        let raw = RawRecord::new("Attendance 7788 : 2024-05-01 08:15:00 1");
        let mark = parse_one(&raw, "10.0.0.1", 42).expect("parse");
        let payload = encode_batch(&[mark]).unwrap();

        let decoded: Vec<BatchEntry> = serde_json::from_str(&payload).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].person, "7788");
        assert_eq!(decoded[0].date, "2024-05-01");
        assert_eq!(decoded[0].time, "08:15:00");
        assert_eq!(decoded[0].clock_ip, "10.0.0.1");
        assert_eq!(decoded[0].clock_id, 42);
    }
}
