use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime};
use std::time::SystemTime;

/// Accepted `date_added` formats, tried in order.
pub const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

/// Result of parsing a single `date_added` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    Date(NaiveDate),
    /// Missing, empty, or not in any accepted format.
    Unparseable,
}

/// Parse a raw date cell against `DATE_FORMATS`, first match wins.
pub fn parse_date_cell(raw: Option<&str>) -> ParsedDate {
    let s = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return ParsedDate::Unparseable,
    };
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map_or(ParsedDate::Unparseable, ParsedDate::Date)
}

/// `now - weeks`, the single boundary used for every row and log file in a run.
pub fn cutoff(now: NaiveDateTime, weeks: u32) -> NaiveDateTime {
    now - Duration::weeks(i64::from(weeks))
}

/// A date is old when its midnight falls strictly before the cutoff.
pub fn is_old(date: NaiveDate, cutoff: NaiveDateTime) -> bool {
    date.and_time(chrono::NaiveTime::MIN) < cutoff
}

/// Filesystem timestamp → local wall-clock time, comparable with a cutoff.
pub fn local_naive(ts: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(ts).naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_both_formats() {
        assert_eq!(parse_date_cell(Some("06/15/2024")), ParsedDate::Date(ymd(2024, 6, 15)));
        assert_eq!(parse_date_cell(Some("2024-06-15")), ParsedDate::Date(ymd(2024, 6, 15)));
        assert_eq!(parse_date_cell(Some(" 1/5/2023 ")), ParsedDate::Date(ymd(2023, 1, 5)));
    }

    #[test]
    fn rejects_garbage_and_impossible_dates() {
        for raw in ["", "   ", "yesterday", "20240615", "02/30/2024", "2024-13-01", "15/06/2024"] {
            assert_eq!(parse_date_cell(Some(raw)), ParsedDate::Unparseable, "{raw:?}");
        }
        assert_eq!(parse_date_cell(None), ParsedDate::Unparseable);
    }

    #[test]
    fn cutoff_is_whole_weeks_back() {
        let now = ymd(2024, 6, 24).and_hms_opt(9, 30, 0).unwrap();
        assert_eq!(cutoff(now, 2), ymd(2024, 6, 10).and_hms_opt(9, 30, 0).unwrap());
        assert_eq!(cutoff(now, 0), now);
    }

    #[test]
    fn old_means_strictly_before() {
        let cut = ymd(2024, 6, 10).and_hms_opt(0, 0, 0).unwrap();
        assert!(is_old(ymd(2024, 6, 9), cut));
        assert!(!is_old(ymd(2024, 6, 10), cut));
        assert!(!is_old(ymd(2024, 6, 15), cut));
    }
}
