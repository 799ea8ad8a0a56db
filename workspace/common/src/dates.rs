//! Date helpers for report queries.

use chrono::{Datelike, Days, Months, NaiveDate};
use tracing::debug;

/// Format accepted for dates in query strings.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a `YYYY-MM-DD` query value, falling back to `today` when the value
/// is missing, empty or malformed.
pub fn parse_date_or(value: Option<&str>, today: NaiveDate) -> NaiveDate {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT).unwrap_or_else(|e| {
            debug!("Ignoring unparsable date '{}': {}", raw, e);
            today
        }),
        None => today,
    }
}

/// First day of the month containing `day` and first day of the following
/// month, as a half-open range.
pub fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day - Days::new(u64::from(day.day0()));
    let next = first
        .checked_add_months(Months::new(1))
        .unwrap_or(NaiveDate::MAX);
    (first, next)
}
