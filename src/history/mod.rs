//! Consumption history analytics
//!
//! Re-buckets raw meal logs into the viewer's local days and derives the
//! numbers behind the nutrition history views. Everything here is a pure
//! function of (records, window, viewer context); nothing is cached between
//! calls.

pub mod aggregate;
pub mod bucket;
pub mod compose;
pub mod filter;
pub mod timezone;

use thiserror::Error;

use crate::source::ApiError;

pub use aggregate::{
    aggregate, apply_insights_override, food_tally, AdherenceStats, AnalyticsSnapshot, DateRange,
    FoodFrequency, Goals, InsightsDiscrepancy, MealDistribution, WeeklyTrends,
};
pub use bucket::{bucketize, DailyBucket};
pub use compose::{compose, run_window, AlignedSeries, HistoryComparison, WindowAnalytics};
pub use filter::{filter, FilterOutcome, Window, FALLBACK_LIMIT, MAX_WINDOW_DAYS};
pub use timezone::{
    parse_timestamp, resolve_timezone, utc_to_local_date, Clock, FixedClock, ResolvedTimezone,
    SystemClock, ViewerContext,
};

/// History error types
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("Could not load consumption history: {0}")]
    Upstream(#[from] ApiError),
}

pub type HistoryResult<T> = Result<T, HistoryError>;
