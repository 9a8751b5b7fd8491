//! Fixed-timezone date helpers.
//!
//! All business dates are anchored to Europe/Istanbul (UTC+3, no DST since
//! 2016). Order timestamps use the `YYYY-MM-DD HH:MM` shape the till has
//! always written; aggregate keys are the `YYYY-MM-DD` date portion and the
//! `YYYY-MM` month portion of that string.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};

use crate::error::{PosError, PosResult};

/// Europe/Istanbul offset in seconds (UTC+3).
const ISTANBUL_OFFSET_SECS: i32 = 3 * 3600;

/// The fixed Istanbul offset.
pub fn istanbul_offset() -> FixedOffset {
    FixedOffset::east_opt(ISTANBUL_OFFSET_SECS).expect("valid fixed offset")
}

/// Current wall-clock time in Istanbul.
pub fn now_istanbul() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&istanbul_offset())
}

/// Today's calendar date in Istanbul.
pub fn today_istanbul() -> NaiveDate {
    now_istanbul().date_naive()
}

/// Format the current Istanbul time as an order timestamp (`YYYY-MM-DD HH:MM`).
pub fn order_timestamp_now() -> String {
    now_istanbul().format("%Y-%m-%d %H:%M").to_string()
}

/// Date portion (`YYYY-MM-DD`) of an order date string, which may carry a
/// time-of-day suffix. Returns the input unchanged when it is too short or
/// a multi-byte character straddles the cut, so malformed dates fall
/// through to [`parse_date`]'s validation error instead of panicking.
pub fn day_of(order_date: &str) -> &str {
    order_date.get(..10).unwrap_or(order_date)
}

/// Month portion (`YYYY-MM`) of an order date string.
pub fn month_of(order_date: &str) -> &str {
    order_date.get(..7).unwrap_or(order_date)
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> PosResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| PosError::validation(format!("Invalid date: {s}")))
}

/// Format a calendar date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Every calendar day from `start` to `end` inclusive. Empty when the range
/// is inverted.
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = start;
    while day <= end {
        days.push(day);
        day += Duration::days(1);
    }
    days
}

/// Every `YYYY-MM` month key touched by the inclusive range, in order.
pub fn months_in_range(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    let mut months = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    while (year, month) <= (end.year(), end.month()) {
        months.push(format!("{year:04}-{month:02}"));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    months
}
