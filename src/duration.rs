//! Duration Parsing
//!
//! Turns human-friendly strings such as `"5 min"` or `"1.5s"` into milliseconds.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{CacheError, Result};

const MS_PER_SEC: f64 = 1000.0;
const MS_PER_MIN: f64 = 60.0 * MS_PER_SEC;
const MS_PER_HOUR: f64 = 60.0 * MS_PER_MIN;
const MS_PER_DAY: f64 = 24.0 * MS_PER_HOUR;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s*([a-z]+)$").expect("duration pattern is valid")
});

/// Milliseconds per unit alias, or None if the alias is unknown.
fn unit_millis(unit: &str) -> Option<f64> {
    match unit.to_ascii_lowercase().as_str() {
        "ms" | "milli" | "millisecond" | "milliseconds" => Some(1.0),
        "s" | "sec" | "secs" | "second" | "seconds" => Some(MS_PER_SEC),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(MS_PER_MIN),
        "h" | "hour" | "hours" => Some(MS_PER_HOUR),
        "d" | "day" | "days" => Some(MS_PER_DAY),
        _ => None,
    }
}

// == Parse Duration ==
/// Parses `<amount>[ ]<unit>` into whole milliseconds.
///
/// The amount may carry a decimal part; the result is rounded to the nearest
/// millisecond.
pub fn parse_duration(value: &str) -> Result<u64> {
    let invalid = || CacheError::InvalidDuration(value.to_string());

    let caps = DURATION_RE.captures(value.trim()).ok_or_else(invalid)?;
    let amount: f64 = caps[1].parse().map_err(|_| invalid())?;
    let per_unit = unit_millis(&caps[2]).ok_or_else(invalid)?;

    Ok((amount * per_unit).round() as u64)
}

// == Max Age ==
/// A maximum age given either as plain milliseconds or as a duration string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MaxAge {
    Millis(u64),
    Text(String),
}

impl MaxAge {
    /// Normalizes to milliseconds. Numbers pass through unchanged.
    pub fn to_millis(&self) -> Result<u64> {
        match self {
            MaxAge::Millis(ms) => Ok(*ms),
            MaxAge::Text(text) => parse_duration(text),
        }
    }
}

impl From<u64> for MaxAge {
    fn from(ms: u64) -> Self {
        MaxAge::Millis(ms)
    }
}

impl From<&str> for MaxAge {
    fn from(text: &str) -> Self {
        MaxAge::Text(text.to_string())
    }
}

impl From<String> for MaxAge {
    fn from(text: String) -> Self {
        MaxAge::Text(text)
    }
}

impl fmt::Display for MaxAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxAge::Millis(ms) => write!(f, "{}ms", ms),
            MaxAge::Text(text) => f.write_str(text),
        }
    }
}
