//! Export time window and conversions to Slack's `ts` encoding.
//!
//! Operator-supplied timestamps carry no offset; they are interpreted in a single
//! configured timezone (`Asia/Tokyo` unless the settings file says otherwise).

use chrono::{DateTime, LocalResult, NaiveDateTime, SecondsFormat, TimeZone};
use chrono_tz::Tz;
use serde::Serialize;

use crate::{AppError, Result};

const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A validated `[start, end]` range, both ends inclusive. Only built through
/// [`TimeWindow::new`] or [`TimeWindow::parse`], so `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
}

/// ISO rendering of a [`TimeWindow`] as it appears in the export document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeWindow {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Result<Self> {
        if start >= end {
            return Err(AppError::InvalidTimeWindow {
                start: to_iso(&start),
                end: to_iso(&end),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse operator input such as `2023-01-01T00:00:00` in the given timezone.
    pub fn parse(start: &str, end: &str, tz: Tz) -> Result<Self> {
        let start = parse_local_datetime(start, tz)?;
        let end = parse_local_datetime(end, tz)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    pub fn oldest_ts(&self) -> String {
        datetime_to_slack_ts(&self.start)
    }

    pub fn latest_ts(&self) -> String {
        datetime_to_slack_ts(&self.end)
    }

    /// Whether a provider timestamp falls inside the window (inclusive).
    /// Unparseable timestamps are treated as outside.
    pub fn contains_ts(&self, ts: &str) -> bool {
        let Some(ts) = SlackTimestamp::parse(ts) else {
            return false;
        };
        let start = SlackTimestamp::from_datetime(&self.start);
        let end = SlackTimestamp::from_datetime(&self.end);
        start <= ts && ts <= end
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: to_iso(&self.start),
            end: to_iso(&self.end),
        }
    }
}

pub fn parse_local_datetime(s: &str, tz: Tz) -> Result<DateTime<Tz>> {
    // chrono accepts single-digit fields; the input contract does not.
    if !has_strict_shape(s) {
        return Err(AppError::InvalidDate(s.to_string()));
    }
    let naive = NaiveDateTime::parse_from_str(s, INPUT_FORMAT)
        .map_err(|_| AppError::InvalidDate(s.to_string()))?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(_, _) | LocalResult::None => {
            Err(AppError::InvalidDate(format!("{} does not exist unambiguously in {}", s, tz.name())))
        }
    }
}

fn has_strict_shape(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 19
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            10 => *b == b'T',
            13 | 16 => *b == b':',
            _ => b.is_ascii_digit(),
        })
}

pub fn to_iso<Z: TimeZone>(dt: &DateTime<Z>) -> String
where
    Z::Offset: std::fmt::Display,
{
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub fn datetime_to_slack_ts<Z: TimeZone>(dt: &DateTime<Z>) -> String {
    format!("{}.{:06}", dt.timestamp(), dt.timestamp_subsec_micros())
}

/// Slack `ts` values ("1672498800.000100") ordered numerically without going
/// through floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlackTimestamp {
    secs: i64,
    micros: u32,
}

impl SlackTimestamp {
    pub fn parse(ts: &str) -> Option<Self> {
        let (secs, frac) = match ts.split_once('.') {
            Some((secs, frac)) => (secs, frac),
            None => (ts, ""),
        };
        let secs = secs.parse::<i64>().ok()?;
        if frac.len() > 6 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let micros = if frac.is_empty() {
            0
        } else {
            format!("{:0<6}", frac).parse::<u32>().ok()?
        };
        Some(Self { secs, micros })
    }

    pub fn from_datetime<Z: TimeZone>(dt: &DateTime<Z>) -> Self {
        Self {
            secs: dt.timestamp(),
            micros: dt.timestamp_subsec_micros(),
        }
    }
}
