//! Fuzzy timestamp normalization.
//!
//! Listing pages publish dates in whatever shape their CMS likes: ISO strings in
//! `datetime` attributes, "Updated: Oct 06, 2025 04:42 PM IST" captions, bare
//! "2 hours ago" labels, epoch milliseconds in data attributes. The normalizer
//! looks for the first recognisable date and time inside the text and ignores the
//! rest. Anything it cannot place yields `None`; a missing timestamp degrades a
//! field, it never fails a record.
//!
//! Timestamps without an explicit offset are read in the normalizer's configured
//! offset. Explicit numeric offsets and `UTC`/`GMT`/`Z` markers win over it.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::types::CanonicalArticle;

/// Canonical display rendering, e.g. `6 Oct 2025, 16:42`.
pub const DISPLAY_FORMAT: &str = "%-d %b %Y, %H:%M";

const MONTHS: &str = "jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec";

lazy_static! {
    static ref EPOCH: Regex = Regex::new(r"^(\d{10}|\d{13})$").unwrap();
    static ref RELATIVE: Regex = Regex::new(
        r"\b(\d+)\s*(seconds?|secs?|minutes?|mins?|hours?|hrs?|days?|weeks?)\s+ago\b"
    )
    .unwrap();
    static ref ISO: Regex = Regex::new(
        r"\b(\d{4})-(\d{1,2})-(\d{1,2})(?:[t ](\d{1,2}):(\d{2})(?::(\d{2})(?:\.\d+)?)?)?\s*(z\b|[+-]\d{2}:?\d{2})?"
    )
    .unwrap();
    static ref DAY_MONTH_YEAR: Regex = Regex::new(&format!(
        r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s+({MONTHS})[a-z]*\.?,?\s+(\d{{4}})\b"
    ))
    .unwrap();
    static ref MONTH_DAY_YEAR: Regex = Regex::new(&format!(
        r"\b({MONTHS})[a-z]*\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"
    ))
    .unwrap();
    static ref SLASHED: Regex = Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap();
    static ref MONTH_DAY: Regex = Regex::new(&format!(
        r"\b({MONTHS})[a-z]*\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b"
    ))
    .unwrap();
    static ref DAY_MONTH: Regex = Regex::new(&format!(
        r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s+({MONTHS})[a-z]*\b"
    ))
    .unwrap();
    static ref TIME: Regex = Regex::new(
        r"\b(\d{1,2}):(\d{2})(?::(\d{2}))?\s*(a\.?m\.?|p\.?m\.?)?(?:\s*(?:utc|gmt)?\s*([+-]\d{2}:?\d{2})\b)?"
    )
    .unwrap();
    static ref UTC_MARKER: Regex = Regex::new(r"\b(utc|gmt|z)\b").unwrap();
}

#[derive(Debug, Clone, Copy)]
pub struct TimestampNormalizer {
    offset: FixedOffset,
}

impl Default for TimestampNormalizer {
    fn default() -> Self {
        Self::utc()
    }
}

impl TimestampNormalizer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(utc_offset())
    }

    /// Parses offsets like `+05:30`, `-0400` or `Z`.
    pub fn from_offset_str(offset: &str) -> Option<Self> {
        let offset = offset.trim().to_ascii_lowercase();
        if offset == "z" || offset == "utc" {
            return Some(Self::utc());
        }
        parse_offset(&offset).map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn normalize(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
        self.normalize_at(raw, Utc::now().with_timezone(&self.offset))
    }

    /// Like [`normalize`](Self::normalize) with an explicit clock for relative and
    /// partial timestamps.
    pub fn normalize_at(&self, raw: &str, now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let text = raw.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }

        if let Some(caps) = EPOCH.captures(&text) {
            let value: i64 = caps[1].parse().ok()?;
            let secs = if caps[1].len() == 13 { value / 1000 } else { value };
            return Utc
                .timestamp_opt(secs, 0)
                .single()
                .map(|dt| dt.with_timezone(&self.offset));
        }

        if let Some(caps) = RELATIVE.captures(&text) {
            let amount: i64 = caps[1].parse().ok()?;
            let delta = match caps[2].chars().next()? {
                's' => Duration::try_seconds(amount),
                'm' => Duration::try_minutes(amount),
                'h' => Duration::try_hours(amount),
                'd' => Duration::try_days(amount),
                'w' => Duration::try_weeks(amount),
                _ => None,
            }?;
            return now.checked_sub_signed(delta);
        }
        if text.contains("just now") {
            return Some(now);
        }

        if let Some(caps) = ISO.captures(&text) {
            let date = ymd(&caps[1], &caps[2], &caps[3])?;
            let time = match caps.get(4) {
                Some(hour) => hms(hour.as_str(), &caps[5], caps.get(6).map(|m| m.as_str()), None)?,
                None => NaiveTime::MIN,
            };
            let zone = match caps.get(7).map(|m| m.as_str()) {
                Some("z") => Some(utc_offset()),
                Some(offset) => Some(parse_offset(offset)?),
                None => None,
            };
            return self.localize(date.and_time(time), zone);
        }

        let (date, rest) = match find_date(&text, now.year()) {
            Some((date, start, end)) => (Some(date), format!("{} {}", &text[..start], &text[end..])),
            None => (None, text.clone()),
        };

        let (time, mut zone) = match TIME.captures(&rest) {
            Some(caps) => {
                let time = hms(&caps[1], &caps[2], caps.get(3).map(|m| m.as_str()), caps.get(4).map(|m| m.as_str()))?;
                let zone = match caps.get(5) {
                    Some(offset) => Some(parse_offset(offset.as_str())?),
                    None => None,
                };
                (Some(time), zone)
            }
            None => (None, None),
        };
        if zone.is_none() && UTC_MARKER.is_match(&rest) {
            zone = Some(utc_offset());
        }

        let naive = match (date, time) {
            (Some(date), time) => date.and_time(time.unwrap_or(NaiveTime::MIN)),
            (None, Some(time)) => now.date_naive().and_time(time),
            (None, None) => return None,
        };
        self.localize(naive, zone)
    }

    /// Batch rendering: the canonical display string when the text parses,
    /// otherwise the trimmed original.
    pub fn display(&self, raw: &str) -> String {
        match self.normalize(raw) {
            // Rendered without a zone, so it must be in the offset it is read back in.
            Some(dt) => format_timestamp(&dt.with_timezone(&self.offset)),
            None => raw.trim().to_string(),
        }
    }

    fn localize(&self, naive: NaiveDateTime, zone: Option<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        zone.unwrap_or(self.offset).from_local_datetime(&naive).single()
    }
}

/// Normalize in UTC. See [`TimestampNormalizer`].
pub fn normalize_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    TimestampNormalizer::utc().normalize(raw)
}

pub fn format_timestamp<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format(DISPLAY_FORMAT).to_string()
}

/// "3 hours ago" within a day, "2 days ago" within a week, "6 Oct 2025" beyond.
pub fn humanize_since(value: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(value);
    let days = diff.num_days();
    if days <= 0 {
        let minutes = diff.num_minutes().max(0);
        if minutes < 60 {
            return format!("{} minute{} ago", minutes, plural(minutes));
        }
        let hours = diff.num_hours();
        return format!("{} hour{} ago", hours, plural(hours));
    }
    if days < 7 {
        return format!("{} day{} ago", days, plural(days));
    }
    value.format("%-d %b %Y").to_string()
}

/// Publication time when known, otherwise when the article was first ingested.
pub fn publication_label(article: &CanonicalArticle, now: DateTime<Utc>) -> String {
    match article.published_at {
        Some(published) => humanize_since(published, now),
        None => format!("Added {}", humanize_since(article.created_at, now)),
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

fn find_date(text: &str, current_year: i32) -> Option<(NaiveDate, usize, usize)> {
    let with_span = |caps: Captures<'_>, date: Option<NaiveDate>| {
        let whole = caps.get(0)?;
        date.map(|d| (d, whole.start(), whole.end()))
    };

    if let Some(caps) = DAY_MONTH_YEAR.captures(text) {
        let date = month_index(&caps[2]).and_then(|m| {
            NaiveDate::from_ymd_opt(caps[3].parse().ok()?, m, caps[1].parse().ok()?)
        });
        return with_span(caps, date);
    }
    if let Some(caps) = MONTH_DAY_YEAR.captures(text) {
        let date = month_index(&caps[1]).and_then(|m| {
            NaiveDate::from_ymd_opt(caps[3].parse().ok()?, m, caps[2].parse().ok()?)
        });
        return with_span(caps, date);
    }
    if let Some(caps) = SLASHED.captures(text) {
        let date = ymd(&caps[3], &caps[1], &caps[2]);
        return with_span(caps, date);
    }
    if let Some(caps) = MONTH_DAY.captures(text) {
        let date = month_index(&caps[1])
            .and_then(|m| NaiveDate::from_ymd_opt(current_year, m, caps[2].parse().ok()?));
        return with_span(caps, date);
    }
    if let Some(caps) = DAY_MONTH.captures(text) {
        let date = month_index(&caps[2])
            .and_then(|m| NaiveDate::from_ymd_opt(current_year, m, caps[1].parse().ok()?));
        return with_span(caps, date);
    }
    None
}

fn month_index(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?;
    MONTHS
        .split('|')
        .position(|m| m == prefix)
        .map(|i| i as u32 + 1)
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn hms(hour: &str, minute: &str, second: Option<&str>, meridiem: Option<&str>) -> Option<NaiveTime> {
    let mut hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    let second: u32 = match second {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    match meridiem.and_then(|m| m.chars().next()) {
        Some('p') if hour < 12 => hour += 12,
        Some('a') if hour == 12 => hour = 0,
        _ => {}
    }
    NaiveTime::from_hms_opt(hour, minute, second)
}

fn parse_offset(offset: &str) -> Option<FixedOffset> {
    let sign = match offset.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let digits: String = offset[1..].chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
