//! Window selection
//!
//! Picks the records whose local date falls inside a trailing window.

use std::cmp::Reverse;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::ViewerContext;
use crate::models::MealLog;

/// How many recent records the "Today" view falls back to
pub const FALLBACK_LIMIT: usize = 10;

/// Longest window accepted; longer requests are capped
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// A trailing span of local calendar days ending today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    days: u32,
}

impl Window {
    /// Zero-day windows are treated as "Today"; anything past
    /// `MAX_WINDOW_DAYS` is capped
    pub fn new(days: u32) -> Self {
        Self { days: days.clamp(1, MAX_WINDOW_DAYS) }
    }

    pub fn today() -> Self {
        Self::new(1)
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn is_today(&self) -> bool {
        self.days == 1
    }

    /// First local date of the window
    pub fn start(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_signed(Duration::days(i64::from(self.days) - 1))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        date >= self.start(today) && date <= today
    }

    /// Every date of the window, oldest first
    pub fn dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        self.start(today).iter_days().take_while(|d| *d <= today).collect()
    }
}

#[derive(Debug, Clone)]
pub struct FilterOutcome<'a> {
    pub records: Vec<&'a MealLog>,
    /// The strict "Today" filter matched nothing and the most recent
    /// records were substituted
    pub used_fallback: bool,
    /// Live records skipped because their timestamp could not be parsed
    pub invalid_timestamps: usize,
}

/// Select the records of `window`.
///
/// Soft-deleted records never match. A one-day window is strict: only
/// records on today's local date. When that yields nothing but there are
/// live records, the `FALLBACK_LIMIT` most recent ones are returned instead,
/// newest first, with `used_fallback` set.
pub fn filter<'a>(logs: &'a [MealLog], window: Window, ctx: &ViewerContext) -> FilterOutcome<'a> {
    let today = ctx.today();
    let live: Vec<&MealLog> = logs.iter().filter(|log| !log.deleted).collect();

    let mut records = Vec::new();
    let mut invalid_timestamps = 0;

    for log in &live {
        match log.instant {
            Some(instant) => {
                if window.contains(ctx.local_date(instant), today) {
                    records.push(*log);
                }
            }
            None => invalid_timestamps += 1,
        }
    }

    if invalid_timestamps > 0 {
        tracing::warn!(
            count = invalid_timestamps,
            "records with unparseable timestamps left out of the window"
        );
    }

    if window.is_today() && records.is_empty() && !live.is_empty() {
        let mut recent: Vec<&MealLog> = live.iter().copied().filter(|log| log.instant.is_some()).collect();
        recent.sort_by_key(|log| Reverse(log.instant));
        recent.truncate(FALLBACK_LIMIT);

        tracing::info!(
            %today,
            timezone = %ctx.timezone.name,
            substituted = recent.len(),
            "no records on today's local date, showing most recent instead"
        );

        return FilterOutcome {
            records: recent,
            used_fallback: true,
            invalid_timestamps,
        };
    }

    FilterOutcome {
        records,
        used_fallback: false,
        invalid_timestamps,
    }
}
