pub mod donations;
pub mod reservations;
pub mod session;

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};

/// Records `field` as missing/invalid unless it holds a `YYYY-MM-DD` date.
pub(crate) fn parse_date(
    field: &str,
    raw: Option<&str>,
    errors: &mut HashMap<String, String>,
) -> Option<NaiveDate> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        errors.insert(field.to_string(), format!("{field} is required"));
        return None;
    };
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.insert(field.to_string(), format!("{field} must be a YYYY-MM-DD date"));
            None
        }
    }
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub(crate) fn parse_time(
    field: &str,
    raw: Option<&str>,
    errors: &mut HashMap<String, String>,
) -> Option<NaiveTime> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        errors.insert(field.to_string(), format!("{field} is required"));
        return None;
    };
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| {
            errors.insert(field.to_string(), format!("{field} must be an HH:MM time"));
        })
        .ok()
}
