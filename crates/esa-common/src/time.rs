//! Date-format inference and time-window utilities for the granule index
//! (C7) and the time-range planner (C8).

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use once_regexes::DATETIME_FORMATS;
use serde::{Deserialize, Serialize};

/// A half-open-by-convention time range, inclusive at both ends as stored
/// (the caller is responsible for any half-open interpretation at the
/// window-generation layer, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Midpoint in seconds since epoch, used as the synthetic `time[i]` value.
    pub fn midpoint_epoch_seconds(&self) -> f64 {
        let start = self.start.timestamp() as f64;
        let end = self.end.timestamp() as f64;
        start + (end - start) / 2.0
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("'{0}' does not match any recognised date format")]
    NoFormatMatched(String),
    #[error("'{0}' matched format {1} but failed to parse")]
    FormatMismatch(String, &'static str),
}

/// One entry of the date-format priority list: a regex that must match a
/// contiguous digit run, the `chrono` format string to parse it with, and the
/// duration (minus one second) to add to derive a missing `end` timestamp.
///
/// Mirrors the source project's `_RE_TO_DATETIME_FORMATS`. Order matters: the
/// first matching pattern wins, most specific (14-digit timestamp) first.
pub struct DateFormatRule {
    pub pattern: &'static str,
    pub chrono_format: &'static str,
    pub default_span: DefaultSpan,
}

/// The amount added to a parsed start time to synthesise a missing end time,
/// expressed as a calendar-aware delta rather than a fixed `Duration` (months
/// and years are not constant-length).
#[derive(Debug, Clone, Copy)]
pub enum DefaultSpan {
    None,
    Minutes(i64),
    Days(i64),
    Months(i32),
    Years(i32),
}

impl DefaultSpan {
    /// Apply this span to `start`, then subtract one second, matching the
    /// source project's `relativedelta(..., seconds=-1)` convention.
    fn apply_minus_one_second(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        let shifted = match self {
            DefaultSpan::None => start,
            DefaultSpan::Minutes(m) => start + Duration::minutes(*m),
            DefaultSpan::Days(d) => start + Duration::days(*d),
            DefaultSpan::Months(m) => add_months(start, *m),
            DefaultSpan::Years(y) => add_months(start, y * 12),
        };
        shifted - Duration::seconds(1)
    }
}

fn add_months(dt: DateTime<Utc>, months: i32) -> DateTime<Utc> {
    let total_months = dt.month0() as i32 + months;
    let year = dt.year() + total_months.div_euclid(12);
    let month0 = total_months.rem_euclid(12);
    let date = NaiveDate::from_ymd_opt(year, (month0 + 1) as u32, dt.day())
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, (month0 + 1) as u32, 1).unwrap());
    Utc.from_utc_datetime(&date.and_time(dt.time()))
}

/// Priority-ordered list of (regex, format, default-span) rules. Most
/// specific first; ordering is load-bearing, not incidental (§9 Design Notes).
mod once_regexes {
    use super::{DateFormatRule, DefaultSpan};
    use regex::Regex;
    use std::sync::OnceLock;

    pub struct CompiledRule {
        pub regex: Regex,
        pub rule: DateFormatRule,
    }

    pub static DATETIME_FORMATS: OnceLock<Vec<CompiledRule>> = OnceLock::new();

    pub fn rules() -> &'static [CompiledRule] {
        DATETIME_FORMATS.get_or_init(|| {
            vec![
                CompiledRule {
                    regex: Regex::new(r"\d{14}").unwrap(),
                    rule: DateFormatRule {
                        pattern: r"\d{14}",
                        chrono_format: "%Y%m%d%H%M%S",
                        default_span: DefaultSpan::None,
                    },
                },
                CompiledRule {
                    regex: Regex::new(r"\d{12}").unwrap(),
                    rule: DateFormatRule {
                        pattern: r"\d{12}",
                        chrono_format: "%Y%m%d%H%M",
                        default_span: DefaultSpan::Minutes(1),
                    },
                },
                CompiledRule {
                    regex: Regex::new(r"\d{8}").unwrap(),
                    rule: DateFormatRule {
                        pattern: r"\d{8}",
                        chrono_format: "%Y%m%d",
                        default_span: DefaultSpan::Days(1),
                    },
                },
                CompiledRule {
                    regex: Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap(),
                    rule: DateFormatRule {
                        pattern: r"\d{4}-\d{2}-\d{2}",
                        chrono_format: "%Y-%m-%d",
                        default_span: DefaultSpan::Days(1),
                    },
                },
                CompiledRule {
                    regex: Regex::new(r"\d{6}").unwrap(),
                    rule: DateFormatRule {
                        pattern: r"\d{6}",
                        chrono_format: "%Y%m",
                        default_span: DefaultSpan::Months(1),
                    },
                },
                CompiledRule {
                    regex: Regex::new(r"\d{4}").unwrap(),
                    rule: DateFormatRule {
                        pattern: r"\d{4}",
                        chrono_format: "%Y",
                        default_span: DefaultSpan::Years(1),
                    },
                },
            ]
        })
    }
}

/// Find the first matching date-format rule in `filename` and the byte span
/// it matched, mirroring the source project's `find_datetime_format`.
pub fn find_datetime_format(filename: &str) -> Option<(&'static DateFormatRule, usize, usize)> {
    for compiled in once_regexes::rules() {
        if let Some(m) = compiled.regex.find(filename) {
            return Some((&compiled.rule, m.start(), m.end()));
        }
    }
    None
}

/// Parse a granule's `(start, end)` pair from its filename, applying the
/// default span when no explicit end timestamp is present in the name.
pub fn parse_granule_time_from_filename(filename: &str) -> Result<TimeRange, TimeParseError> {
    let (rule, start, end) = find_datetime_format(filename)
        .ok_or_else(|| TimeParseError::NoFormatMatched(filename.to_string()))?;
    let matched = &filename[start..end];
    let start_dt = parse_with_format(matched, rule.chrono_format)
        .ok_or(TimeParseError::FormatMismatch(filename.to_string(), rule.chrono_format))?;
    let end_dt = rule.default_span.apply_minus_one_second(start_dt);
    Ok(TimeRange::new(start_dt, end_dt))
}

fn parse_with_format(text: &str, format: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(text, format) {
        return Some(Utc.from_utc_datetime(&dt));
    }
    // Date-only formats parse via NaiveDate then anchor at midnight.
    if let Ok(d) = NaiveDate::parse_from_str(text, format) {
        return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap()));
    }
    None
}

/// Parse a strict ISO-8601 timestamp or bare date, as used for the `t0_req`,
/// `t1_req` open parameters and `properties.date` feature fields.
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap()));
    }
    Err(TimeParseError::NoFormatMatched(s.to_string()))
}

/// Generate daily half-open windows `[day 00:00, next-day 00:00)` covering
/// `[t0, t1]` inclusive, per §4.8's `day` frequency rule. A zero-width request
/// still emits exactly one window.
pub fn daily_windows(t0: DateTime<Utc>, t1: DateTime<Utc>) -> Vec<TimeRange> {
    let mut windows = Vec::new();
    let mut day_start = t0.date_naive().and_hms_opt(0, 0, 0).unwrap();
    let last_day = t1.date_naive();
    loop {
        let day_end = day_start + Duration::days(1);
        windows.push(TimeRange::new(
            Utc.from_utc_datetime(&day_start),
            Utc.from_utc_datetime(&day_end),
        ));
        if day_start.date() >= last_day {
            break;
        }
        day_start = day_end;
    }
    windows
}

/// Generate monthly windows aligned to month-start, covering `[t0, t1]`.
pub fn monthly_windows(t0: DateTime<Utc>, t1: DateTime<Utc>) -> Vec<TimeRange> {
    let mut windows = Vec::new();
    let mut month_start =
        NaiveDate::from_ymd_opt(t0.year(), t0.month(), 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    loop {
        let month_start_dt = Utc.from_utc_datetime(&month_start);
        let month_end = Utc.from_utc_datetime(&add_months(month_start_dt, 1).naive_utc());
        windows.push(TimeRange::new(month_start_dt, month_end));
        if month_start_dt >= t1.date_naive().and_hms_opt(0, 0, 0).map(|d| Utc.from_utc_datetime(&d)).unwrap()
            && month_start_dt.year() == t1.year()
            && month_start_dt.month() == t1.month()
        {
            break;
        }
        if month_end > t1 {
            break;
        }
        month_start = month_end.naive_utc();
    }
    windows
}

/// Generate yearly windows aligned to January 1st, covering `[t0, t1]`.
pub fn yearly_windows(t0: DateTime<Utc>, t1: DateTime<Utc>) -> Vec<TimeRange> {
    let mut windows = Vec::new();
    let mut year = t0.year();
    loop {
        let start = Utc.from_utc_datetime(&NaiveDate::from_ymd_opt(year, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
        let end = Utc.from_utc_datetime(&NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
        windows.push(TimeRange::new(start, end));
        if end > t1 {
            break;
        }
        year += 1;
    }
    windows
}
