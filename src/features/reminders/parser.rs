//! Time expression parsing
//!
//! Turns the normalized time string from intent classification into an
//! absolute instant. Pure: the caller supplies `now` (and with it the time
//! zone that "today" refers to).
//!
//! Recognized forms, first match wins:
//! 1. `<n> second|minute|hour[s]` relative to now (a missing `n` counts as 0)
//! 2. RFC 3339 / RFC 2822 / `YYYY-MM-DD[ HH:MM[:SS]]` absolute instants
//! 3. `H:MM [AM|PM]` clock times, rolled to tomorrow when already past
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Out-of-range clock times fail instead of wrapping
//! - 1.1.0: Added `reminder_text` payload extraction
//! - 1.0.0: Initial release

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Naive layouts tried after RFC 3339 / 2822, interpreted in the caller's zone
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse '{input}': {reason}")]
pub struct ParseFailure {
    pub input: String,
    pub reason: String,
}

impl ParseFailure {
    pub fn new(input: &str) -> Self {
        Self::with_reason(input, "no recognized time pattern")
    }

    pub fn with_reason(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

fn relative_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\d*)\s*(second|minute|hour)s?").expect("relative pattern is valid")
    })
}

fn clock_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2}):(\d{2})\s*(am|pm)?\b").expect("clock pattern is valid")
    })
}

/// Resolve `text` to an absolute instant relative to `now`.
///
/// Never panics on malformed input; the only error is [`ParseFailure`].
pub fn parse_time_expression<Tz: TimeZone>(
    text: &str,
    now: &DateTime<Tz>,
) -> Result<DateTime<Utc>, ParseFailure> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseFailure::with_reason(text, "empty time expression"));
    }

    if let Some(result) = parse_relative(trimmed, now) {
        return result;
    }

    if let Some(instant) = parse_absolute(trimmed, now) {
        return Ok(instant);
    }

    if let Some(result) = parse_clock_time(trimmed, now) {
        return result;
    }

    Err(ParseFailure::new(text))
}

fn parse_relative<Tz: TimeZone>(
    text: &str,
    now: &DateTime<Tz>,
) -> Option<Result<DateTime<Utc>, ParseFailure>> {
    let caps = relative_pattern().captures(text)?;

    let amount: i64 = match caps.get(1).map(|m| m.as_str()).unwrap_or("") {
        "" => 0,
        digits => match digits.parse() {
            Ok(n) => n,
            Err(_) => return Some(Err(ParseFailure::with_reason(text, "duration too large"))),
        },
    };

    let unit_seconds: i64 = match caps[2].to_lowercase().as_str() {
        "second" => 1,
        "minute" => 60,
        _ => 3600,
    };

    let offset = amount
        .checked_mul(unit_seconds)
        .and_then(Duration::try_seconds)
        .and_then(|delta| now.with_timezone(&Utc).checked_add_signed(delta));

    Some(offset.ok_or_else(|| ParseFailure::with_reason(text, "duration too large")))
}

fn parse_absolute<Tz: TimeZone>(text: &str, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }

    let tz = now.timezone();
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_clock_time<Tz: TimeZone>(
    text: &str,
    now: &DateTime<Tz>,
) -> Option<Result<DateTime<Utc>, ParseFailure>> {
    let caps = clock_pattern().captures(text)?;

    let (hour, minute) = match (caps[1].parse::<u32>(), caps[2].parse::<u32>()) {
        (Ok(h), Ok(m)) => (h, m),
        _ => return Some(Err(ParseFailure::with_reason(text, "malformed clock time"))),
    };

    let hour = match caps.get(3).map(|m| m.as_str().to_lowercase()) {
        Some(ref meridiem) if meridiem == "pm" && hour != 12 => hour + 12,
        Some(ref meridiem) if meridiem == "am" && hour == 12 => 0,
        _ => hour,
    };

    let Some(clock) = NaiveTime::from_hms_opt(hour, minute, 0) else {
        return Some(Err(ParseFailure::with_reason(
            text,
            format!("clock time {hour}:{minute:02} is out of range"),
        )));
    };

    let tz = now.timezone();
    let today = now.date_naive();
    let at_day = |date: NaiveDate| {
        tz.from_local_datetime(&date.and_time(clock))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    };

    let now_utc = now.with_timezone(&Utc);
    let candidate = match at_day(today) {
        Some(instant) if instant > now_utc => Some(instant),
        _ => today.succ_opt().and_then(at_day),
    };

    Some(candidate.ok_or_else(|| ParseFailure::with_reason(text, "clock time does not exist locally")))
}

fn prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:please\s+)?remind\s+me\s+(?:to\s+|about\s+|that\s+)?")
            .expect("prefix pattern is valid")
    })
}

fn suffix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\s+(?:in\s+\d*\s*(?:second|minute|hour)s?|at\s+\d{1,2}:\d{2}\s*(?:am|pm)?)\s*[.!]?\s*$",
        )
        .expect("suffix pattern is valid")
    })
}

/// Derive the reminder payload from the raw utterance.
///
/// "Remind me to call mom in 5 minutes" becomes "call mom". Falls back to the
/// trimmed utterance when stripping leaves nothing.
pub fn reminder_text(utterance: &str) -> String {
    let without_prefix = prefix_pattern().replace(utterance, "");
    let stripped = suffix_pattern().replace(&without_prefix, "");
    let stripped = stripped.trim();

    if stripped.is_empty() {
        utterance.trim().to_string()
    } else {
        stripped.to_string()
    }
}
