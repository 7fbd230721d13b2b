//! Local-date resolution
//!
//! Every calendar question the history views ask ("which day was this meal",
//! "what is today") goes through a single `ViewerContext`, captured once per
//! render and passed down explicitly.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::{HistoryError, HistoryResult};

/// Used when no configured or ambient timezone can be resolved
pub const FALLBACK_TIMEZONE: Tz = chrono_tz::UTC;

/// Naive layouts accepted for timestamps that carry no offset. Such
/// timestamps are taken to be UTC.
const NAIVE_LAYOUTS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Source of "now", injectable for tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The viewer's timezone, pinned to the offset in effect at resolution time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTimezone {
    #[serde(skip)]
    pub tz: Tz,
    pub name: String,
    pub utc_offset_minutes: i32,
    pub display_name: String,
}

impl ResolvedTimezone {
    pub fn new(tz: Tz, at: DateTime<Utc>) -> Self {
        let offset_seconds = tz.offset_from_utc_datetime(&at.naive_utc()).fix().local_minus_utc();
        let utc_offset_minutes = offset_seconds / 60;
        let sign = if utc_offset_minutes < 0 { '-' } else { '+' };
        let abs = utc_offset_minutes.abs();

        Self {
            tz,
            name: tz.name().to_string(),
            utc_offset_minutes,
            display_name: format!("{} (UTC{}{:02}:{:02})", tz.name(), sign, abs / 60, abs % 60),
        }
    }

    pub fn utc(at: DateTime<Utc>) -> Self {
        Self::new(FALLBACK_TIMEZONE, at)
    }

    /// Local calendar date of an instant in this timezone
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }
}

fn parse_tz_name(name: &str) -> Option<Tz> {
    // POSIX allows a leading ':' in TZ
    let name = name.trim().trim_start_matches(':');
    if name.is_empty() {
        return None;
    }
    match name.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(_) => {
            tracing::warn!(timezone = name, "unknown timezone name, ignoring");
            None
        }
    }
}

/// Resolve the viewer's timezone.
///
/// Tries `preferred`, then the `TZ` environment variable, then falls back
/// to UTC. Never fails.
pub fn resolve_timezone(preferred: Option<&str>, at: DateTime<Utc>) -> ResolvedTimezone {
    let ambient = std::env::var("TZ").ok();
    let tz = preferred
        .and_then(parse_tz_name)
        .or_else(|| ambient.as_deref().and_then(parse_tz_name))
        .unwrap_or(FALLBACK_TIMEZONE);
    ResolvedTimezone::new(tz, at)
}

/// Parse a record timestamp into a UTC instant.
///
/// Accepts RFC 3339, offsets without a colon, naive date-times (read as
/// UTC) and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> HistoryResult<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HistoryError::InvalidTimestamp(raw.to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, layout) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(HistoryError::InvalidTimestamp(raw.to_string()))
}

/// Local date of a raw timestamp in `timezone`
pub fn utc_to_local_date(raw: &str, timezone: &ResolvedTimezone) -> HistoryResult<NaiveDate> {
    parse_timestamp(raw).map(|instant| timezone.local_date(instant))
}

/// "Now" and "where" for one render of the history views
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerContext {
    pub now: DateTime<Utc>,
    pub timezone: ResolvedTimezone,
}

impl ViewerContext {
    pub fn new(now: DateTime<Utc>, timezone: ResolvedTimezone) -> Self {
        Self { now, timezone }
    }

    /// Read the clock and resolve the timezone once
    pub fn capture(clock: &dyn Clock, preferred_timezone: Option<&str>) -> Self {
        let now = clock.now();
        Self::new(now, resolve_timezone(preferred_timezone, now))
    }

    pub fn today(&self) -> NaiveDate {
        self.timezone.local_date(self.now)
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.timezone.local_date(instant)
    }
}
