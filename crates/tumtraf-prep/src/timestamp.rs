// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Frame timestamp parsing.
//!
//! TUMTraf frame files are named after their capture time, e.g.
//! `20240404-140235.137590.jpg`. The stem is a date, a literal `-`, a time,
//! a literal `.` and exactly six fractional digits.

use chrono::NaiveDateTime;

use crate::Error;

/// Length of a well-formed frame stem (`YYYYMMDD-HHMMSS.ffffff`).
pub const STEM_LEN: usize = 22;

const STEM_FORMAT: &str = "%Y%m%d-%H%M%S%.f";

/// Parse a frame stem into integer milliseconds since the epoch.
///
/// The stem is interpreted as UTC and the result is floored to the
/// millisecond. Anything that is not exactly `YYYYMMDD-HHMMSS.ffffff` is
/// rejected with [`Error::MalformedTimestamp`]; truncated stems are never
/// padded or coerced.
///
/// ```rust
/// use tumtraf_prep::parse_timestamp_ms;
///
/// let a = parse_timestamp_ms("20240404-140235.137590")?;
/// let b = parse_timestamp_ms("20240404-140235.287999")?;
/// assert_eq!(b - a, 150);
/// # Ok::<(), tumtraf_prep::Error>(())
/// ```
pub fn parse_timestamp_ms(stem: &str) -> Result<i64, Error> {
    if !is_well_formed(stem) {
        return Err(Error::MalformedTimestamp(stem.to_string()));
    }

    let parsed = NaiveDateTime::parse_from_str(stem, STEM_FORMAT)
        .map_err(|_| Error::MalformedTimestamp(stem.to_string()))?;

    Ok(parsed.and_utc().timestamp_millis())
}

/// Shape check ahead of chrono, which is lenient about fractional digits.
fn is_well_formed(stem: &str) -> bool {
    let bytes = stem.as_bytes();
    if bytes.len() != STEM_LEN {
        return false;
    }

    bytes.iter().enumerate().all(|(i, b)| match i {
        8 => *b == b'-',
        15 => *b == b'.',
        _ => b.is_ascii_digit(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_epoch() {
        assert_eq!(parse_timestamp_ms("19700101-000000.000000").unwrap(), 0);
        assert_eq!(parse_timestamp_ms("19700101-000001.500000").unwrap(), 1500);
    }

    #[test]
    fn test_parse_floors_microseconds() {
        // 999 microseconds do not make a full millisecond
        assert_eq!(parse_timestamp_ms("19700101-000000.000999").unwrap(), 0);
        assert_eq!(parse_timestamp_ms("19700101-000000.001999").unwrap(), 1);
    }

    #[test]
    fn test_parse_monotonic_across_midnight() {
        let before = parse_timestamp_ms("20231231-235959.900000").unwrap();
        let after = parse_timestamp_ms("20240101-000000.100000").unwrap();
        assert_eq!(after - before, 200);
    }

    #[test]
    fn test_parse_truncated_stem() {
        let result = parse_timestamp_ms("20240404-140235.1375");
        assert!(matches!(result, Err(Error::MalformedTimestamp(s)) if s == "20240404-140235.1375"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for stem in [
            "",
            "not-a-timestamp",
            "20240404_140235.137590",
            "20240404-140235-137590",
            "20241304-140235.137590",
            "20240404-250235.137590",
            "20240404-140235.13759a",
            "20240404-140235.137590.jpg",
        ] {
            assert!(
                matches!(parse_timestamp_ms(stem), Err(Error::MalformedTimestamp(_))),
                "{stem} should be rejected"
            );
        }
    }
}
