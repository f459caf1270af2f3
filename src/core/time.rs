//! UTC time keys used to partition logs and assets.

use super::{Result, VaultError};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Uses the caller-supplied RFC 3339 timestamp when present (backdated
/// replays), the current time otherwise.
pub fn resolve_timestamp(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        None => Ok(Utc::now()),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|err| VaultError::validation(format!("invalid timestamp '{raw}': {err}"))),
    }
}

/// `YYYY-MM`
pub fn month_key(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m").to_string()
}

/// `YYYY-MM-DD`
pub fn date_key(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

pub fn iso_string(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn validate_month_key(month: &str) -> Result<()> {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| VaultError::validation(format!("invalid month '{month}', expected YYYY-MM")))
}
