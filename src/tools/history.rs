//! Nutrition History Tools
//!
//! Fetch consumption records and run them through the history pipeline
//! for one viewer context.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::history::{compose, AlignedSeries, Goals, HistoryError, ResolvedTimezone, ViewerContext, WindowAnalytics};
use crate::models::{normalize, Nutrient};
use crate::source::RecordSource;

/// Default number of records pulled from the API per request
pub const DEFAULT_HISTORY_LIMIT: u32 = 500;

/// What to load and how to slice it
#[derive(Debug, Clone)]
pub struct HistoryRequest {
    pub window_days: u32,
    pub comparison_days: Option<u32>,
    /// Metrics to build aligned series for; empty means all of them
    pub metrics: Vec<Nutrient>,
    pub limit: u32,
    /// Ask the API for soft-deleted rows too. They are still excluded
    /// from every window.
    pub include_deleted: bool,
}

impl HistoryRequest {
    pub fn new(window_days: u32) -> Self {
        Self {
            window_days,
            comparison_days: None,
            metrics: Vec::new(),
            limit: DEFAULT_HISTORY_LIMIT,
            include_deleted: false,
        }
    }

    fn requested_metrics(&self) -> Vec<Nutrient> {
        if self.metrics.is_empty() {
            Nutrient::ALL.to_vec()
        } else {
            self.metrics.clone()
        }
    }
}

/// Response for get_nutrition_history
#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub timezone: ResolvedTimezone,
    pub generated_at: DateTime<Utc>,
    pub today: NaiveDate,
    pub records_fetched: usize,
    /// False when the upstream daily summary could not be fetched
    pub insights_available: bool,
    pub primary: WindowAnalytics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<WindowAnalytics>,
    pub series: Vec<AlignedSeries>,
}

/// Response for get_timezone
#[derive(Debug, Clone, Serialize)]
pub struct TimezoneResponse {
    pub timezone: ResolvedTimezone,
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
}

pub fn describe_timezone(ctx: &ViewerContext) -> TimezoneResponse {
    TimezoneResponse {
        timezone: ctx.timezone.clone(),
        now: ctx.now,
        today: ctx.today(),
    }
}

/// Load history and insights concurrently, then compose both windows.
///
/// A history failure is fatal. An insights failure only drops the
/// single-day override and is reported through `insights_available`.
pub async fn load_history(
    source: &dyn RecordSource,
    ctx: &ViewerContext,
    goals: &Goals,
    request: &HistoryRequest,
) -> Result<HistoryView, HistoryError> {
    let (history, insights) = tokio::join!(
        source.fetch_history(request.limit, request.include_deleted),
        source.fetch_daily_insights(),
    );

    let records = history?;

    let (insights, insights_available) = match insights {
        Ok(insights) => (insights, true),
        Err(e) => {
            tracing::warn!(error = %e, "daily insights unavailable, using local totals");
            (None, false)
        }
    };

    let logs = normalize(&records);
    let comparison = compose(
        &logs,
        request.window_days,
        request.comparison_days,
        ctx,
        goals,
        insights.as_ref(),
    );

    let series = request
        .requested_metrics()
        .into_iter()
        .map(|metric| comparison.aligned_series(metric))
        .collect();

    tracing::info!(
        records = records.len(),
        window_days = request.window_days,
        comparison_days = ?request.comparison_days,
        timezone = %ctx.timezone.name,
        "composed nutrition history"
    );

    Ok(HistoryView {
        timezone: ctx.timezone.clone(),
        generated_at: ctx.now,
        today: comparison.today,
        records_fetched: records.len(),
        insights_available,
        primary: comparison.primary,
        comparison: comparison.comparison,
        series,
    })
}
