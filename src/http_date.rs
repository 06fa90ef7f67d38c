// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Small helpers to parse HTTP-date (IMF-fixdate) values.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Parse an HTTP-date string (IMF-fixdate) into a `chrono::DateTime<Utc>`.
pub fn parse_http_date_to_datetime(s: &str) -> Option<DateTime<Utc>> {
    httpdate::parse_http_date(s.trim())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Interpret a `Retry-After` value, either delay-seconds or an HTTP-date.
///
/// Dates in the past yield a zero delay.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let v = value.trim();
    if let Ok(secs) = v.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = parse_http_date_to_datetime(v)?;
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
