//! Date/time conversions used by the coercion table and the marshaller.
//!
//! Dates travel as `NaiveDateTime`. Two numeric encodings are supported:
//! automation dates (fractional days since 1899-12-30) and Unix seconds.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

/// Text format used when a date is rendered as a string.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

// 0100-01-01 and 9999-12-31 in automation-date days.
const MIN_OLE_DAYS: f64 = -657_434.0;
const MAX_OLE_DAYS: f64 = 2_958_466.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

fn ole_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Convert an automation date to a date/time.
///
/// The integer part counts days from the epoch; the fractional part is the
/// time of day regardless of sign, so `-1.25` is 1899-12-29 06:00.
pub fn from_ole(days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() || !(MIN_OLE_DAYS..MAX_OLE_DAYS).contains(&days) {
        return None;
    }
    let whole = days.trunc();
    let fraction = (days - whole).abs();
    let millis = (fraction * MILLIS_PER_DAY).round() as i64;
    ole_epoch()
        .checked_add_signed(Duration::days(whole as i64))?
        .checked_add_signed(Duration::milliseconds(millis))
}

/// Convert a date/time to an automation date.
pub fn to_ole(value: NaiveDateTime) -> f64 {
    let delta = value - ole_epoch();
    let mut days = delta.num_days();
    let mut rest = (delta - Duration::days(days)).num_milliseconds();
    if rest < 0 {
        days -= 1;
        rest += MILLIS_PER_DAY as i64;
    }
    let time_of_day = rest as f64 / MILLIS_PER_DAY;
    if days < 0 {
        days as f64 - time_of_day
    } else {
        days as f64 + time_of_day
    }
}

/// Convert Unix seconds (UTC) to a date/time.
pub fn from_unix(seconds: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.naive_utc())
}

/// Unix seconds (UTC) of a date/time, dropping sub-second precision.
pub fn to_unix(value: NaiveDateTime) -> i64 {
    value.and_utc().timestamp()
}

/// Parse a date/time from text, trying the accepted layouts in turn.
pub fn parse(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Render a date/time with `DISPLAY_FORMAT`.
pub fn format(value: &NaiveDateTime) -> String {
    value.format(DISPLAY_FORMAT).to_string()
}
