//! Timestamp parsing for archive pages
//!
//! Pipermail renders dates ctime-style with a zone abbreviation,
//! e.g. `Mon Jan  6 12:00:00 EST 2020`. Anything else is handed to `dateparser`.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

const CTIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Zone abbreviations seen in mailing-list archives, as offsets in hours east of UTC
const ZONE_OFFSETS: &[(&str, i32)] = &[
    ("UT", 0),
    ("UTC", 0),
    ("GMT", 0),
    ("WET", 0),
    ("EST", -5),
    ("EDT", -4),
    ("CST", -6),
    ("CDT", -5),
    ("MST", -7),
    ("MDT", -6),
    ("PST", -8),
    ("PDT", -7),
    ("BST", 1),
    ("CET", 1),
    ("MET", 1),
    ("CEST", 2),
    ("MEST", 2),
    ("EET", 2),
    ("EEST", 3),
    ("JST", 9),
];

/// Parses a free-text archive timestamp into UTC
///
/// Returns `None` when the text cannot be understood; callers decide the fallback.
pub fn parse_archive_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    parse_ctime(&tokens).or_else(|| {
        let normalized = tokens.join(" ");
        match dateparser::parse_with_timezone(&normalized, &Utc) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::trace!("dateparser rejected '{}': {}", normalized, e);
                None
            }
        }
    })
}

/// `Www Mmm d hh:mm:ss [ZONE] yyyy`
fn parse_ctime(tokens: &[&str]) -> Option<DateTime<Utc>> {
    let (zone, fields) = match tokens {
        [weekday, month, day, time, zone, year] => {
            (Some(*zone), [*weekday, *month, *day, *time, *year])
        }
        [weekday, month, day, time, year] => (None, [*weekday, *month, *day, *time, *year]),
        _ => return None,
    };

    let naive = NaiveDateTime::parse_from_str(&fields.join(" "), CTIME_FORMAT).ok()?;
    let offset = match zone {
        None => FixedOffset::east_opt(0)?,
        Some(zone) => zone_offset(zone)?,
    };

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Resolves `EST`, `+0100`, `-05:00` style zone tokens
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    if let Some(sign) = zone.chars().next().filter(|c| *c == '+' || *c == '-') {
        let digits: String = zone[1..].chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() != 4 {
            return None;
        }
        let hours: i32 = digits[..2].parse().ok()?;
        let minutes: i32 = digits[2..].parse().ok()?;
        let seconds = hours * 3600 + minutes * 60;
        return FixedOffset::east_opt(if sign == '-' { -seconds } else { seconds });
    }

    let upper = zone.to_ascii_uppercase();
    match ZONE_OFFSETS.iter().find(|(name, _)| *name == upper) {
        Some((_, hours)) => FixedOffset::east_opt(hours * 3600),
        None => {
            // Unknown abbreviation: keep the wall-clock time rather than lose the date
            tracing::debug!("Unknown time zone '{}', assuming UTC", zone);
            FixedOffset::east_opt(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_pipermail_stamp_with_zone() {
        assert_eq!(
            parse_archive_timestamp("Mon Jan  6 12:00:00 EST 2020"),
            Some(utc(2020, 1, 6, 17, 0, 0))
        );
    }

    #[test]
    fn test_pipermail_stamp_with_european_zone() {
        assert_eq!(
            parse_archive_timestamp("Wed Jan  1 10:30:00 CET 2020"),
            Some(utc(2020, 1, 1, 9, 30, 0))
        );
    }

    #[test]
    fn test_pipermail_stamp_without_zone() {
        assert_eq!(
            parse_archive_timestamp("Sat Feb  1 00:00:00 2020"),
            Some(utc(2020, 2, 1, 0, 0, 0))
        );
    }

    #[test]
    fn test_numeric_zone() {
        assert_eq!(
            parse_archive_timestamp("Sun Mar  1 08:15:00 +0100 2020"),
            Some(utc(2020, 3, 1, 7, 15, 0))
        );
    }

    #[test]
    fn test_unknown_zone_assumes_utc() {
        assert_eq!(
            parse_archive_timestamp("Mon Jan  6 12:00:00 XYZT 2020"),
            Some(utc(2020, 1, 6, 12, 0, 0))
        );
    }

    #[test]
    fn test_falls_back_to_dateparser() {
        assert_eq!(
            parse_archive_timestamp("2020-01-06T12:00:00Z"),
            Some(utc(2020, 1, 6, 12, 0, 0))
        );
        assert_eq!(
            parse_archive_timestamp("Mon, 06 Jan 2020 12:00:00 +0000"),
            Some(utc(2020, 1, 6, 12, 0, 0))
        );
    }

    #[test]
    fn test_fallback_without_zone_is_utc() {
        assert_eq!(
            parse_archive_timestamp("2020-01-06 12:00:00"),
            Some(utc(2020, 1, 6, 12, 0, 0))
        );
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_archive_timestamp(""), None);
        assert_eq!(parse_archive_timestamp("   "), None);
        assert_eq!(parse_archive_timestamp("not a date at all"), None);
    }
}
