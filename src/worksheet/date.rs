//! Worksheet date handling.
//!
//! Sheets edited in spreadsheets come back with either `/` or `-`
//! separators, with or without leading zeros. Values are always stored
//! and exported as zero-padded `MM-DD-YYYY`.

use chrono::NaiveDate;

/// Columns normalized on parse.
pub const DATE_COLUMNS: [&str; 2] = ["START_DATE", "END_DATE"];

/// Storage and export format.
pub const WORKSHEET_DATE_FORMAT: &str = "%m-%d-%Y";

/// Parses `M/D/YYYY`, `MM-DD-YYYY` or any mix of separators and padding.
#[must_use]
pub fn parse(value: &str) -> Option<NaiveDate> {
    let value = value.trim().replace('/', "-");
    let mut parts = value.split('-');
    let (month, day, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some()
        || !(1..=2).contains(&month.len())
        || !(1..=2).contains(&day.len())
        || year.len() != 4
        || ![month, day, year].iter().all(|part| part.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Re-emits a parseable date as `MM-DD-YYYY`.
#[must_use]
pub fn normalize(value: &str) -> Option<String> {
    parse(value).map(format)
}

/// Formats a date as `MM-DD-YYYY`.
#[must_use]
pub fn format(date: NaiveDate) -> String {
    date.format(WORKSHEET_DATE_FORMAT).to_string()
}

/// Compact `YYYYMMDD` stamp used for course ID suffixes.
#[must_use]
pub fn stamp(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_slash_and_unpadded_dates() {
        assert_eq!(normalize("1/29/2015").as_deref(), Some("01-29-2015"));
        assert_eq!(normalize("5/3/2015").as_deref(), Some("05-03-2015"));
        assert_eq!(normalize("05-08-2015").as_deref(), Some("05-08-2015"));
        assert_eq!(normalize("05/08/2015").as_deref(), Some("05-08-2015"));
    }

    #[test]
    fn rejects_other_formats() {
        assert!(normalize("2015-05-08").is_none());
        assert!(normalize("13/01/2015").is_none());
        assert!(normalize("May 8 2015").is_none());
        assert!(normalize("5/8/15").is_none());
    }

    #[test]
    fn rejects_signed_parts() {
        assert!(normalize("+1/5/2015").is_none());
        assert!(normalize("1/+5/2015").is_none());
        assert!(normalize("01-05-+015").is_none());
    }

    #[test]
    fn stamps_end_dates() {
        let date = parse("03-08-2015").unwrap();
        assert_eq!(stamp(date), "20150308");
    }
}
