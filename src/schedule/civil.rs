//! Fixed-offset civil-time conversion
//!
//! Last-published timestamps are stored as `YYYY/MM/DD HH:MM:SS` strings
//! with no offset marker, written and read as civil time at a fixed UTC+9
//! offset. Conversion to an absolute instant must attach that offset
//! exactly once: parsing the string as UTC and then re-labelling the result
//! as +9 applies the offset twice and shifts every comparison by nine
//! hours. This module is the only place that conversion happens.

use chrono::{DateTime, FixedOffset, NaiveDateTime, ParseError, TimeZone, Utc};

/// Stored timestamp layout
pub const LAYOUT: &str = "%Y/%m/%d %H:%M:%S";

/// Offset of the stored civil time, in hours east of UTC
pub const STORE_OFFSET_HOURS: i32 = 9;

/// The fixed offset stored timestamps are written in
pub fn store_offset() -> FixedOffset {
    FixedOffset::east_opt(STORE_OFFSET_HOURS * 3600).expect("store offset is in range")
}

/// Convert a stored civil-time string to an absolute instant.
///
/// The string is parsed as naive civil time and the fixed offset is
/// attached once, so `2024/01/01 09:00:00` becomes midnight UTC.
pub fn to_instant(stored: &str) -> Result<DateTime<Utc>, ParseError> {
    let naive = NaiveDateTime::parse_from_str(stored, LAYOUT)?;
    let fixed = store_offset()
        .from_local_datetime(&naive)
        .single()
        .expect("fixed-offset civil time is unambiguous");
    Ok(fixed.with_timezone(&Utc))
}

/// Render an absolute instant in the stored civil-time representation.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&store_offset())
        .format(LAYOUT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_instant_attaches_offset_once() {
        // 09:00 civil at +9 is midnight UTC. A double-applied offset would
        // land at 15:00 the previous day instead.
        let instant = to_instant("2024/01/01 09:00:00").unwrap();
        assert_eq!(
            instant,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_to_instant_midnight() {
        let instant = to_instant("2024/01/01 00:00:00").unwrap();
        assert_eq!(
            instant,
            Utc.with_ymd_and_hms(2023, 12, 31, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_to_instant_rejects_malformed() {
        assert!(to_instant("2024-01-01 00:00:00").is_err());
        assert!(to_instant("not a date").is_err());
        assert!(to_instant("").is_err());
    }

    #[test]
    fn test_format_instant() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_instant(instant), "2024/01/01 09:00:00");
    }

    #[test]
    fn test_round_trip() {
        let stored = "2024/03/15 21:05:30";
        let instant = to_instant(stored).unwrap();
        assert_eq!(format_instant(instant), stored);
    }
}
