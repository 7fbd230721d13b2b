//! Dual-window composition
//!
//! Runs the filter, bucket and aggregate stages once per window and lines
//! the results up for overlay charts.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::{
    aggregate, apply_insights_override, bucketize, filter, AnalyticsSnapshot, DailyBucket, Goals,
    ViewerContext, Window,
};
use crate::models::{DailyInsights, MealLog, Nutrient};

/// One window's pipeline result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowAnalytics {
    pub window_days: u32,
    pub used_fallback: bool,
    pub invalid_timestamps: usize,
    pub snapshot: AnalyticsSnapshot,
}

/// Run filter, bucketize and aggregate for a single window.
///
/// The upstream daily summary only takes part for a one-day window.
pub fn run_window(
    logs: &[MealLog],
    window: Window,
    ctx: &ViewerContext,
    goals: &Goals,
    insights: Option<&DailyInsights>,
) -> WindowAnalytics {
    let outcome = filter(logs, window, ctx);
    let buckets = bucketize(&outcome.records, &ctx.timezone);
    let mut snapshot = aggregate(&outcome.records, buckets, ctx.today(), goals);

    if window.is_today() {
        if let Some(insights) = insights {
            apply_insights_override(&mut snapshot, insights, goals);
        }
    }

    WindowAnalytics {
        window_days: window.days(),
        used_fallback: outcome.used_fallback,
        invalid_timestamps: outcome.invalid_timestamps,
        snapshot,
    }
}

/// Primary window plus an optional independent comparison window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryComparison {
    pub today: NaiveDate,
    pub primary: WindowAnalytics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<WindowAnalytics>,
}

/// A metric on a shared date axis, ready for an overlay chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedSeries {
    pub metric: Nutrient,
    pub dates: Vec<NaiveDate>,
    pub primary_values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_values: Option<Vec<f64>>,
}

fn value_on(history: &[DailyBucket], date: NaiveDate, metric: Nutrient) -> f64 {
    history
        .binary_search_by_key(&date, |b| b.date)
        .map(|i| history[i].totals.get(metric))
        .unwrap_or(0.0)
}

/// Run both windows. The two runs share nothing but the input slice.
pub fn compose(
    logs: &[MealLog],
    primary_days: u32,
    comparison_days: Option<u32>,
    ctx: &ViewerContext,
    goals: &Goals,
    insights: Option<&DailyInsights>,
) -> HistoryComparison {
    let primary = run_window(logs, Window::new(primary_days), ctx, goals, insights);
    let comparison = comparison_days.map(|days| run_window(logs, Window::new(days), ctx, goals, insights));

    HistoryComparison {
        today: ctx.today(),
        primary,
        comparison,
    }
}

impl HistoryComparison {
    /// Series for `metric` on an axis of `primary` window length ending today.
    ///
    /// Comparison values are aligned by position within their own window:
    /// axis index `i` reads day `i` of the comparison window, counted from
    /// its first date, whatever calendar date the primary axis shows there.
    /// Days past the end of a shorter comparison window, and days without
    /// data, read as 0.
    pub fn aligned_series(&self, metric: Nutrient) -> AlignedSeries {
        let primary_window = Window::new(self.primary.window_days);
        let dates = primary_window.dates(self.today);

        let primary_history = &self.primary.snapshot.daily_history;
        let primary_values = dates.iter().map(|d| value_on(primary_history, *d, metric)).collect();

        let comparison_values = self.comparison.as_ref().map(|comparison| {
            let window = Window::new(comparison.window_days);
            let start = window.start(self.today);
            let history = &comparison.snapshot.daily_history;

            (0..dates.len())
                .map(|position| {
                    if position >= window.days() as usize {
                        return 0.0;
                    }
                    start
                        .checked_add_signed(Duration::days(position as i64))
                        .map(|date| value_on(history, date, metric))
                        .unwrap_or(0.0)
                })
                .collect()
        });

        AlignedSeries {
            metric,
            dates,
            primary_values,
            comparison_values,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::history::{parse_timestamp, ResolvedTimezone, MAX_WINDOW_DAYS};
    use crate::models::{MealType, Nutrition};

    fn log(ts: &str, protein: f64) -> MealLog {
        MealLog {
            id: ts.to_string(),
            instant: parse_timestamp(ts).ok(),
            raw_timestamp: ts.to_string(),
            food_name: "Chicken".to_string(),
            meal_type: MealType::Dinner,
            nutrition: Nutrition { calories: protein * 5.0, protein, ..Default::default() },
            diabetes_suitable: true,
            deleted: false,
        }
    }

    fn ctx() -> ViewerContext {
        let now = parse_timestamp("2024-06-14T12:00:00Z").unwrap();
        ViewerContext::new(now, ResolvedTimezone::utc(now))
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// One record per day from June 1 to June 14, protein = day of month
    fn fortnight() -> Vec<MealLog> {
        (1..=14).map(|d| log(&format!("2024-06-{:02}T18:00:00Z", d), d as f64)).collect()
    }

    #[test]
    fn test_comparison_does_not_touch_primary() {
        let logs = fortnight();
        let alone = compose(&logs, 7, None, &ctx(), &Goals::default(), None);
        let paired = compose(&logs, 7, Some(14), &ctx(), &Goals::default(), None);

        assert_eq!(alone.primary, paired.primary);
        assert!(alone.comparison.is_none());

        let comparison = paired.comparison.unwrap();
        assert_eq!(comparison.window_days, 14);
        assert_eq!(comparison.snapshot.total_meals, 14);
        assert_eq!(paired.primary.snapshot.total_meals, 7);
    }

    #[test]
    fn test_aligned_series_by_relative_position() {
        let logs = fortnight();
        let result = compose(&logs, 7, Some(14), &ctx(), &Goals::default(), None);
        let series = result.aligned_series(Nutrient::Protein);

        assert_eq!(series.dates.len(), 7);
        assert_eq!(series.dates[0], date("2024-06-08"));
        assert_eq!(series.dates[6], date("2024-06-14"));
        assert_eq!(series.primary_values, vec![8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0]);

        // Day 1 of the 14-day window is June 1
        let comparison = series.comparison_values.unwrap();
        assert_eq!(comparison.len(), 7);
        assert_eq!(comparison, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_aligned_series_shorter_comparison_pads_with_zero() {
        let logs = fortnight();
        let result = compose(&logs, 7, Some(3), &ctx(), &Goals::default(), None);
        let series = result.aligned_series(Nutrient::Protein);
        assert_eq!(series.comparison_values.unwrap(), vec![12.0, 13.0, 14.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_aligned_series_missing_days_are_zero() {
        let logs = vec![log("2024-06-10T18:00:00Z", 30.0), log("2024-06-14T08:00:00Z", 20.0)];
        let result = compose(&logs, 7, None, &ctx(), &Goals::default(), None);
        let series = result.aligned_series(Nutrient::Protein);
        assert_eq!(series.primary_values, vec![0.0, 0.0, 30.0, 0.0, 0.0, 0.0, 20.0]);
        assert!(series.comparison_values.is_none());
    }

    #[test]
    fn test_insights_only_override_single_day_window() {
        let logs = fortnight();
        let mut today_totals = BTreeMap::new();
        today_totals.insert("protein".to_string(), 99.0);
        let insights = DailyInsights { today_totals, ..Default::default() };

        let result = compose(&logs, 1, Some(7), &ctx(), &Goals::default(), Some(&insights));
        assert!(result.primary.snapshot.insights_override_applied);
        assert_eq!(result.primary.snapshot.daily_averages.protein, 99.0);
        assert!(result.primary.snapshot.insights_discrepancy.is_some());

        let week = result.comparison.unwrap();
        assert!(!week.snapshot.insights_override_applied);
        assert_eq!(week.snapshot.daily_averages.protein, 11.0);
    }

    #[test]
    fn test_today_fallback_surfaces_through_window() {
        let logs = vec![log("2024-06-01T18:00:00Z", 10.0)];
        let result = compose(&logs, 1, None, &ctx(), &Goals::default(), None);
        assert!(result.primary.used_fallback);
        assert_eq!(result.primary.snapshot.total_meals, 1);

        // The chart axis is still just today, which has no data
        let series = result.aligned_series(Nutrient::Protein);
        assert_eq!(series.dates, vec![date("2024-06-14")]);
        assert_eq!(series.primary_values, vec![0.0]);
    }

    #[test]
    fn test_huge_window_is_capped_not_fatal() {
        let logs = vec![log("2024-06-14T08:00:00Z", 30.0)];
        let result = compose(&logs, 200_000_000, Some(u32::MAX), &ctx(), &Goals::default(), None);

        assert_eq!(result.primary.window_days, MAX_WINDOW_DAYS);
        assert_eq!(result.primary.snapshot.total_meals, 1);

        let series = result.aligned_series(Nutrient::Protein);
        assert_eq!(series.dates.len(), MAX_WINDOW_DAYS as usize);
        assert_eq!(series.primary_values.last(), Some(&30.0));
        assert_eq!(series.comparison_values.unwrap().len(), MAX_WINDOW_DAYS as usize);
    }

    #[test]
    fn test_compose_is_repeatable() {
        let logs = fortnight();
        let a = compose(&logs, 7, Some(14), &ctx(), &Goals::default(), None);
        let b = compose(&logs, 7, Some(14), &ctx(), &Goals::default(), None);
        assert_eq!(a, b);
        assert_eq!(a.aligned_series(Nutrient::Calories), b.aligned_series(Nutrient::Calories));
    }
}
