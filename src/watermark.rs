//! Incremental watermark (bookmark) values
//!
//! A watermark keeps the value it was built from and the UTC instant that
//! value normalizes to. Ordering only looks at the instant, so `2020-01-02`,
//! `2020-01-02T00:00:00Z` and `1577923200` compare equal.

use crate::error::{Error, Result};
use crate::types::WatermarkFormat;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;
use std::cmp::Ordering;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// A comparable "extract records strictly newer than this" value
#[derive(Debug, Clone)]
pub struct Watermark {
    raw: Value,
    instant: DateTime<Utc>,
}

impl Watermark {
    /// Normalize a JSON value: strings are parsed as dates, integers as epoch seconds
    pub fn parse(value: &Value) -> Result<Self> {
        let instant = match value {
            Value::String(s) => parse_instant(s)?,
            Value::Number(n) => {
                if let Some(secs) = n.as_i64() {
                    from_epoch(secs, 0, value)?
                } else if let Some(secs) = n.as_f64() {
                    let whole = secs.floor();
                    let nanos = ((secs - whole) * 1e9).round() as u32;
                    from_epoch(whole as i64, nanos.min(999_999_999), value)?
                } else {
                    return Err(Error::watermark(value, "number out of range"));
                }
            }
            other => {
                return Err(Error::watermark(
                    other,
                    "expected a date string or an epoch timestamp",
                ))
            }
        };

        Ok(Self {
            raw: value.clone(),
            instant,
        })
    }

    /// Normalize a string value
    pub fn parse_str(value: &str) -> Result<Self> {
        Self::parse(&Value::String(value.to_string()))
    }

    /// Watermark for an instant; the raw value is its ISO 8601 form
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self {
            raw: Value::String(instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            instant,
        }
    }

    /// Normalized instant
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// Value as originally received
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Canonical persisted form, e.g. `2020-01-04T00:00:00Z`
    pub fn to_iso8601(&self) -> String {
        self.instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// Render for use as a request parameter
    pub fn format(&self, format: WatermarkFormat) -> String {
        match format {
            WatermarkFormat::Iso8601 => self.to_iso8601(),
            WatermarkFormat::Timestamp => self.instant.timestamp().to_string(),
            WatermarkFormat::DateString => self.instant.format("%Y-%m-%d").to_string(),
            WatermarkFormat::DateTimeString => {
                self.instant.format("%Y-%m-%d %H:%M:%S").to_string()
            }
            WatermarkFormat::Passthrough => match &self.raw {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }

    /// The later of `self` and `candidate`; ties keep `self`
    #[must_use]
    pub fn advance(self, candidate: Watermark) -> Watermark {
        if candidate.instant > self.instant {
            candidate
        } else {
            self
        }
    }

    /// Fold a batch of replication-key values into the watermark.
    ///
    /// `null` values are skipped; anything else that fails to normalize is an error.
    pub fn advance_all<'a, I>(self, values: I) -> Result<Watermark>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        values
            .into_iter()
            .filter(|v| !v.is_null())
            .try_fold(self, |current, value| {
                Ok(current.advance(Watermark::parse(value)?))
            })
    }
}

impl PartialEq for Watermark {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
    }
}

impl Eq for Watermark {}

impl PartialOrd for Watermark {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Watermark {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant)
    }
}

impl std::fmt::Display for Watermark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn parse_instant(input: &str) -> Result<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return Err(Error::watermark(input, "empty string"));
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        let secs: i64 = s
            .parse()
            .map_err(|_| Error::watermark(input, "epoch timestamp out of range"))?;
        return from_epoch(secs, 0, input);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(Error::watermark(input, "unrecognized date format"))
}

fn from_epoch(secs: i64, nanos: u32, original: impl ToString) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, nanos)
        .single()
        .ok_or_else(|| Error::watermark(original, "epoch timestamp out of range"))
}
