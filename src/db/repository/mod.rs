//! Repository layer: entity-scoped database operations.
//!
//! Clinic accounts back authentication; patient records are always read and
//! written through a clinic id. All public functions are re-exported here.

mod clinic;
mod patient;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

use super::DatabaseError;

pub use clinic::*;
pub use patient::*;

/// Current time at the precision timestamps are stored with, so a value
/// returned from a write equals the value read back later.
pub fn now_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 (UTC, microseconds) so text order is time order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_text_round_trips() {
        let now = now_timestamp();
        let text = format_timestamp(&now);
        assert!(text.ends_with('Z'));
        assert_eq!(parse_timestamp(&text).unwrap(), now);
    }

    #[test]
    fn timestamp_text_sorts_chronologically() {
        let earlier = parse_timestamp("2025-01-01T09:00:00.000001Z").unwrap();
        let later = parse_timestamp("2025-01-01T10:00:00Z").unwrap();
        assert!(format_timestamp(&earlier) < format_timestamp(&later));
    }

    #[test]
    fn malformed_timestamp_is_constraint_violation() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(DatabaseError::ConstraintViolation(_))
        ));
    }
}
