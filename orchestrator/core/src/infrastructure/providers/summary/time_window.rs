// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Time window extraction for summary requests
//
// Understands explicit ranges ("from X to Y", "between X and Y"), relative
// phrases ("yesterday", "last week", "past 3 days") and a single date or
// timestamp. Anything else covers the last 24 hours.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use regex::Regex;

static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:from|between)\s+(.+?)\s+(?:to|and)\s+(.+)").expect("Invalid range regex")
});

static PAST_N: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:past|last)\s+(\d+)\s+(day|week|month|year)s?\b").expect("Invalid relative range regex")
});

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d{4}-\d{2}-\d{2}(?:[t ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:z|[+-]\d{2}:\d{2})?)?")
        .expect("Invalid timestamp regex")
});

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an RFC 3339 timestamp, a naive `YYYY-MM-DD[ T]HH:MM[:SS[.f]]`
/// (taken as UTC) or a bare date (midnight UTC).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = text
        .trim_end_matches(|c| c == 'Z' || c == 'z')
        .replacen('t', "T", 1);
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&naive, format) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(&naive, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

/// First timestamp-looking span of `text` that parses.
pub fn find_timestamp(text: &str) -> Option<DateTime<Utc>> {
    TIMESTAMP
        .find_iter(text)
        .find_map(|m| parse_timestamp(m.as_str()))
}

fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(t) + TimeDelta::days(1) - TimeDelta::microseconds(1)
}

fn is_midnight(t: DateTime<Utc>) -> bool {
    t.time() == NaiveTime::MIN
}

fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    TimeDelta::try_days(days)
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Inclusive UTC interval a summary covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }

    /// Work out the window a request refers to, relative to `now`.
    pub fn parse(query: &str, now: DateTime<Utc>) -> Self {
        if let Some(window) = Self::explicit_range(query) {
            return window;
        }

        let q = query.to_lowercase();

        if q.contains("day before yesterday") {
            let day = days_before(now, 2);
            return Self::new(start_of_day(day), end_of_day(day));
        }
        if q.contains("yesterday") {
            let day = days_before(now, 1);
            return Self::new(start_of_day(day), end_of_day(day));
        }
        if q.contains("today") {
            return Self::new(start_of_day(now), now);
        }
        if q.contains("last week") || q.contains("past week") {
            return Self::new(start_of_day(days_before(now, 7)), now);
        }
        if q.contains("last month") || q.contains("past month") {
            return Self::new(start_of_day(days_before(now, 30)), now);
        }

        if let Some(caps) = PAST_N.captures(&q) {
            if let Ok(n) = caps[1].parse::<i64>() {
                let days = match &caps[2] {
                    "week" => n.saturating_mul(7),
                    "month" => n.saturating_mul(30),
                    "year" => n.saturating_mul(365),
                    _ => n,
                };
                return Self::new(days_before(now, days), now);
            }
        }

        if let Some(t) = find_timestamp(query) {
            return if is_midnight(t) {
                Self::new(t, end_of_day(t))
            } else {
                Self::new(t, t)
            };
        }

        Self::new(days_before(now, 1), now)
    }

    fn explicit_range(query: &str) -> Option<Self> {
        let caps = RANGE.captures(query)?;
        let start = find_timestamp(&caps[1])?;
        let end = find_timestamp(&caps[2])?;
        let end = if is_midnight(end) { end_of_day(end) } else { end };
        Some(Self::new(start, end))
    }
}
