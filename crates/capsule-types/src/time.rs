use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Source of "now" for unlock checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Zone-less layouts; these are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses an ISO-8601 timestamp into UTC.
///
/// Accepts an explicit `Z` or numeric offset, a zone-less date-time (taken to
/// be UTC), or a bare `YYYY-MM-DD` (midnight UTC). Returns `None` for anything
/// else, including the empty string.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    // Offsets without a colon, e.g. +0200
    if let Ok(dt) = DateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(ndt.and_utc());
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

/// Fixed-width form used in storage, so text order matches time order.
pub fn to_storage(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn test_parse_with_milliseconds_and_z() {
        let ts = parse_timestamp("2024-12-25T10:30:00.000Z").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 12, 25));
        assert_eq!((ts.hour(), ts.minute()), (10, 30));
    }

    #[test]
    fn test_parse_with_z() {
        let ts = parse_timestamp("2024-06-15T14:30:00Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 6, 15, 14, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_is_utc() {
        let ts = parse_timestamp("2024-06-15T14:30:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 6, 15, 14, 30, 0).unwrap());

        let ts = parse_timestamp("2024-06-15T14:30:00.250").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 250);

        let ts = parse_timestamp("2024-06-15T14:30").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 6, 15, 14, 30, 0).unwrap());

        let ts = parse_timestamp("2024-06-15 14:30:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 6, 15, 14, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_offsets_normalized_to_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 15, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-06-15T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-06-15T14:30:00+0200"), Some(expected));
    }

    #[test]
    fn test_parse_date_only() {
        let ts = parse_timestamp("2024-06-15").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp("invalid-date"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("2024-13-40"), None);
    }

    #[test]
    fn test_storage_form_round_trips_and_sorts() {
        let early = Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();
        assert_eq!(to_storage(&early), "2024-06-15T09:00:00.000000Z");
        assert!(to_storage(&early) < to_storage(&late));
        assert_eq!(parse_timestamp(&to_storage(&late)), Some(late));
    }

    #[test]
    fn test_manual_clock() {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), start + Duration::hours(2));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
