//! Analytics aggregation
//!
//! Derives averages, distributions, rankings and goal adherence from one
//! window's records and daily buckets.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DailyBucket;
use crate::models::{DailyInsights, MealLog, MealType, Nutrient, Nutrition};

/// Number of entries kept in the top-foods ranking
pub const TOP_FOODS_LIMIT: usize = 10;

/// Number of trailing buckets in the weekly trend series
pub const WEEKLY_TREND_DAYS: usize = 7;

/// Upstream and local single-day totals further apart than this are reported
const DISCREPANCY_TOLERANCE: f64 = 0.5;

/// Fixed daily goals used for adherence percentages
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goals {
    pub calories: f64,
    pub protein: f64,       // grams
    pub carbohydrates: f64, // grams
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            calories: 2000.0,
            protein: 100.0,
            carbohydrates: 250.0,
        }
    }
}

/// Record counts per meal type. All four keys are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MealDistribution {
    pub breakfast: usize,
    pub lunch: usize,
    pub dinner: usize,
    pub snack: usize,
}

impl MealDistribution {
    pub fn record(&mut self, meal_type: MealType) {
        match meal_type {
            MealType::Breakfast => self.breakfast += 1,
            MealType::Lunch => self.lunch += 1,
            MealType::Dinner => self.dinner += 1,
            MealType::Snack => self.snack += 1,
        }
    }

    pub fn get(&self, meal_type: MealType) -> usize {
        match meal_type {
            MealType::Breakfast => self.breakfast,
            MealType::Lunch => self.lunch,
            MealType::Dinner => self.dinner,
            MealType::Snack => self.snack,
        }
    }

    pub fn total(&self) -> usize {
        MealType::ALL.iter().map(|t| self.get(*t)).sum()
    }
}

/// Per-nutrient series over the last `WEEKLY_TREND_DAYS` buckets
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeeklyTrends {
    pub dates: Vec<NaiveDate>,
    pub calories: Vec<f64>,
    pub protein: Vec<f64>,
    pub carbohydrates: Vec<f64>,
    pub fat: Vec<f64>,
    pub fiber: Vec<f64>,
    pub sugar: Vec<f64>,
    pub sodium: Vec<f64>,
}

impl WeeklyTrends {
    fn from_buckets(buckets: &[DailyBucket]) -> Self {
        let tail = &buckets[buckets.len().saturating_sub(WEEKLY_TREND_DAYS)..];
        let column = |n: Nutrient| tail.iter().map(|b| b.totals.get(n)).collect::<Vec<f64>>();

        Self {
            dates: tail.iter().map(|b| b.date).collect(),
            calories: column(Nutrient::Calories),
            protein: column(Nutrient::Protein),
            carbohydrates: column(Nutrient::Carbohydrates),
            fat: column(Nutrient::Fat),
            fiber: column(Nutrient::Fiber),
            sugar: column(Nutrient::Sugar),
            sodium: column(Nutrient::Sodium),
        }
    }

    pub fn series(&self, nutrient: Nutrient) -> &[f64] {
        match nutrient {
            Nutrient::Calories => &self.calories,
            Nutrient::Protein => &self.protein,
            Nutrient::Carbohydrates => &self.carbohydrates,
            Nutrient::Fat => &self.fat,
            Nutrient::Fiber => &self.fiber,
            Nutrient::Sugar => &self.sugar,
            Nutrient::Sodium => &self.sodium,
        }
    }
}

/// Percentages, each within [0, 100]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AdherenceStats {
    pub diabetes_suitable_percentage: f64,
    pub calorie_goal_adherence: f64,
    pub protein_goal_adherence: f64,
    pub carb_goal_adherence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodFrequency {
    pub food: String,
    pub frequency: usize,
    pub total_calories: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Upstream single-day totals that disagree with the local computation.
///
/// Neither side is assumed right; this is surfaced for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InsightsDiscrepancy {
    pub local: Nutrition,
    pub upstream: Nutrition,
    pub max_abs_difference: f64,
}

/// Everything the history views show for one window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSnapshot {
    pub total_meals: usize,
    pub daily_averages: Nutrition,
    pub daily_history: Vec<DailyBucket>,
    pub meal_distribution: MealDistribution,
    pub weekly_trends: WeeklyTrends,
    pub adherence_stats: AdherenceStats,
    pub top_foods: Vec<FoodFrequency>,
    pub date_range: DateRange,
    /// Daily averages were replaced by the upstream daily summary
    pub insights_override_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights_discrepancy: Option<InsightsDiscrepancy>,
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() { value.clamp(0.0, 100.0) } else { 0.0 }
}

fn goal_adherence(average: f64, goal: f64) -> f64 {
    if goal <= 0.0 {
        return 0.0;
    }
    clamp_percent(100.0 * average / goal)
}

fn daily_averages(buckets: &[DailyBucket]) -> Nutrition {
    let total: Nutrition = buckets.iter().map(|b| b.totals).sum();
    let count = buckets.len().max(1) as f64;
    let mut averages = Nutrition::zero();
    for n in Nutrient::ALL {
        averages.set(n, total.get(n) / count);
    }
    averages
}

fn fill_goal_adherence(stats: &mut AdherenceStats, averages: &Nutrition, goals: &Goals) {
    stats.calorie_goal_adherence = goal_adherence(averages.calories, goals.calories);
    stats.protein_goal_adherence = goal_adherence(averages.protein, goals.protein);
    stats.carb_goal_adherence = goal_adherence(averages.carbohydrates, goals.carbohydrates);
}

/// Full frequency tally by exact food name, ranked by frequency with ties
/// kept in first-seen order
pub fn food_tally(records: &[&MealLog]) -> Vec<FoodFrequency> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut tally: Vec<FoodFrequency> = Vec::new();

    for record in records {
        match index.get(record.food_name.as_str()) {
            Some(&i) => {
                tally[i].frequency += 1;
                tally[i].total_calories += record.nutrition.calories;
            }
            None => {
                index.insert(record.food_name.as_str(), tally.len());
                tally.push(FoodFrequency {
                    food: record.food_name.clone(),
                    frequency: 1,
                    total_calories: record.nutrition.calories,
                });
            }
        }
    }

    // Stable sort: equal frequencies stay in encounter order
    tally.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    tally
}

/// Build the snapshot for one window.
///
/// Total over degenerate input: no records and no buckets give zeros and a
/// date range collapsed onto `today`.
pub fn aggregate(
    records: &[&MealLog],
    buckets: Vec<DailyBucket>,
    today: NaiveDate,
    goals: &Goals,
) -> AnalyticsSnapshot {
    let daily_averages = daily_averages(&buckets);

    let mut meal_distribution = MealDistribution::default();
    for record in records {
        meal_distribution.record(record.meal_type);
    }

    let suitable = records.iter().filter(|r| r.diabetes_suitable).count();
    let mut adherence_stats = AdherenceStats {
        diabetes_suitable_percentage: clamp_percent(100.0 * suitable as f64 / records.len().max(1) as f64),
        ..Default::default()
    };
    fill_goal_adherence(&mut adherence_stats, &daily_averages, goals);

    let mut top_foods = food_tally(records);
    top_foods.truncate(TOP_FOODS_LIMIT);

    let date_range = match (buckets.first(), buckets.last()) {
        (Some(first), Some(last)) => DateRange { start: first.date, end: last.date },
        _ => DateRange { start: today, end: today },
    };

    AnalyticsSnapshot {
        total_meals: records.len(),
        daily_averages,
        weekly_trends: WeeklyTrends::from_buckets(&buckets),
        daily_history: buckets,
        meal_distribution,
        adherence_stats,
        top_foods,
        date_range,
        insights_override_applied: false,
        insights_discrepancy: None,
    }
}

/// Swap in the upstream daily summary's totals as the daily averages.
///
/// Used only for the single-day view so it matches the dashboard cards.
/// Does nothing when the summary carries no core nutrient totals. Goal
/// adherence follows the overridden averages.
pub fn apply_insights_override(snapshot: &mut AnalyticsSnapshot, insights: &DailyInsights, goals: &Goals) {
    if !insights.has_totals() {
        return;
    }

    let local = snapshot.daily_averages;
    let upstream = insights.overlay_totals(&local);

    let max_abs_difference = Nutrient::ALL
        .iter()
        .map(|n| (local.get(*n) - upstream.get(*n)).abs())
        .fold(0.0, f64::max);

    if max_abs_difference > DISCREPANCY_TOLERANCE {
        tracing::warn!(
            local_calories = local.calories,
            upstream_calories = upstream.calories,
            max_abs_difference,
            "daily insights disagree with locally computed totals"
        );
        snapshot.insights_discrepancy = Some(InsightsDiscrepancy {
            local,
            upstream,
            max_abs_difference,
        });
    }

    snapshot.daily_averages = upstream;
    fill_goal_adherence(&mut snapshot.adherence_stats, &upstream, goals);
    snapshot.insights_override_applied = true;
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::history::{bucketize, parse_timestamp, ResolvedTimezone};

    fn log(ts: &str, food: &str, meal: MealType, calories: f64) -> MealLog {
        MealLog {
            id: format!("{}-{}", ts, food),
            instant: parse_timestamp(ts).ok(),
            raw_timestamp: ts.to_string(),
            food_name: food.to_string(),
            meal_type: meal,
            nutrition: Nutrition {
                calories,
                protein: calories / 20.0,
                carbohydrates: calories / 8.0,
                ..Default::default()
            },
            diabetes_suitable: false,
            deleted: false,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn snapshot_of(logs: &[MealLog]) -> AnalyticsSnapshot {
        let refs: Vec<&MealLog> = logs.iter().collect();
        let tz = ResolvedTimezone::utc(parse_timestamp("2024-06-10T12:00:00Z").unwrap());
        let buckets = bucketize(&refs, &tz);
        aggregate(&refs, buckets, today(), &Goals::default())
    }

    #[test]
    fn test_two_day_average() {
        let logs = vec![
            log("2024-06-09T12:00:00Z", "Pasta", MealType::Lunch, 500.0),
            log("2024-06-10T12:00:00Z", "Salad", MealType::Lunch, 700.0),
        ];
        let snap = snapshot_of(&logs);
        assert_eq!(snap.daily_averages.calories, 600.0);
        assert_eq!(snap.total_meals, 2);
        assert_eq!(snap.daily_history.len(), 2);
        assert_eq!(
            snap.date_range,
            DateRange {
                start: NaiveDate::from_ymd_opt(2024, 6, 9).unwrap(),
                end: today(),
            }
        );
    }

    #[test]
    fn test_empty_snapshot_is_all_zeros() {
        let snap = snapshot_of(&[]);
        assert_eq!(snap.total_meals, 0);
        assert_eq!(snap.daily_averages, Nutrition::zero());
        assert_eq!(snap.meal_distribution, MealDistribution::default());
        assert_eq!(snap.adherence_stats, AdherenceStats::default());
        assert!(snap.top_foods.is_empty());
        assert!(snap.weekly_trends.dates.is_empty());
        assert_eq!(snap.date_range, DateRange { start: today(), end: today() });

        let json = serde_json::to_value(&snap).unwrap();
        for key in ["breakfast", "lunch", "dinner", "snack"] {
            assert_eq!(json["meal_distribution"][key], 0);
        }
    }

    #[test]
    fn test_averages_times_bucket_count_recover_totals() {
        let logs = vec![
            log("2024-06-05T08:00:00Z", "Eggs", MealType::Breakfast, 310.0),
            log("2024-06-05T19:00:00Z", "Steak", MealType::Dinner, 820.0),
            log("2024-06-07T13:00:00Z", "Soup", MealType::Lunch, 233.3),
            log("2024-06-10T21:00:00Z", "Apple", MealType::Snack, 95.0),
        ];
        let snap = snapshot_of(&logs);
        let count = snap.daily_history.len() as f64;
        for n in Nutrient::ALL {
            let total: f64 = logs.iter().map(|l| l.nutrition.get(n)).sum();
            assert!((snap.daily_averages.get(n) * count - total).abs() < 1e-6);
        }
    }

    #[test]
    fn test_calorie_adherence_is_clamped() {
        let logs = vec![log("2024-06-10T12:00:00Z", "Feast", MealType::Dinner, 2400.0)];
        let snap = snapshot_of(&logs);
        assert_eq!(snap.daily_averages.calories, 2400.0);
        assert_eq!(snap.adherence_stats.calorie_goal_adherence, 100.0);
        // 2400 / 20 = 120g protein against a 100g goal
        assert_eq!(snap.adherence_stats.protein_goal_adherence, 100.0);
        // 2400 / 8 = 300g carbs against 250g
        assert_eq!(snap.adherence_stats.carb_goal_adherence, 100.0);

        let logs = vec![log("2024-06-10T12:00:00Z", "Snack", MealType::Snack, 500.0)];
        let snap = snapshot_of(&logs);
        assert_eq!(snap.adherence_stats.calorie_goal_adherence, 25.0);
    }

    #[test]
    fn test_meal_distribution_sums_to_total() {
        let logs = vec![
            log("2024-06-10T07:00:00Z", "Toast", MealType::Breakfast, 200.0),
            log("2024-06-10T07:05:00Z", "Coffee", MealType::Breakfast, 5.0),
            log("2024-06-10T18:00:00Z", "Curry", MealType::Dinner, 650.0),
            log("2024-06-10T22:00:00Z", "Nuts", MealType::Snack, 180.0),
        ];
        let snap = snapshot_of(&logs);
        assert_eq!(snap.meal_distribution.breakfast, 2);
        assert_eq!(snap.meal_distribution.lunch, 0);
        assert_eq!(snap.meal_distribution.dinner, 1);
        assert_eq!(snap.meal_distribution.snack, 1);
        assert_eq!(snap.meal_distribution.total(), snap.total_meals);
    }

    #[test]
    fn test_diabetes_suitable_percentage() {
        let mut logs = vec![
            log("2024-06-10T07:00:00Z", "Oats", MealType::Breakfast, 300.0),
            log("2024-06-10T12:00:00Z", "Cake", MealType::Lunch, 450.0),
            log("2024-06-10T18:00:00Z", "Fish", MealType::Dinner, 500.0),
            log("2024-06-10T21:00:00Z", "Soda", MealType::Snack, 150.0),
        ];
        logs[0].diabetes_suitable = true;
        logs[2].diabetes_suitable = true;
        logs[3].diabetes_suitable = true;
        let snap = snapshot_of(&logs);
        assert_eq!(snap.adherence_stats.diabetes_suitable_percentage, 75.0);
    }

    #[test]
    fn test_top_foods_ranking_and_ties() {
        let mut logs = Vec::new();
        // "Tea" seen first, "Rice" and "Tea" both 3x: Tea must rank first
        for (i, food) in ["Tea", "Rice", "Tea", "Rice", "Beans", "Tea", "Rice"].iter().enumerate() {
            logs.push(log(&format!("2024-06-10T{:02}:00:00Z", i + 6), food, MealType::Snack, 100.0));
        }
        // Twelve singletons overflow the cap
        for i in 0..12 {
            logs.push(log("2024-06-09T12:00:00Z", &format!("Single {}", i), MealType::Lunch, 10.0));
        }

        let snap = snapshot_of(&logs);
        assert_eq!(snap.top_foods.len(), TOP_FOODS_LIMIT);
        assert_eq!(snap.top_foods[0].food, "Tea");
        assert_eq!(snap.top_foods[0].frequency, 3);
        assert_eq!(snap.top_foods[0].total_calories, 300.0);
        assert_eq!(snap.top_foods[1].food, "Rice");
        assert_eq!(snap.top_foods[2].food, "Beans");
        assert_eq!(snap.top_foods[3].food, "Single 0");
        assert!(snap.top_foods.windows(2).all(|w| w[0].frequency >= w[1].frequency));

        let refs: Vec<&MealLog> = logs.iter().collect();
        let tally = food_tally(&refs);
        assert_eq!(tally.len(), 15);
        assert!(tally.iter().any(|f| f.food == "Single 11"));
        assert_eq!(tally.iter().map(|f| f.frequency).sum::<usize>(), logs.len());
    }

    #[test]
    fn test_weekly_trends_keep_last_seven_days() {
        let logs: Vec<MealLog> = (1..=10)
            .map(|d| log(&format!("2024-06-{:02}T12:00:00Z", d), "Rice", MealType::Lunch, d as f64 * 100.0))
            .collect();
        let snap = snapshot_of(&logs);
        assert_eq!(snap.daily_history.len(), 10);
        assert_eq!(snap.weekly_trends.dates.len(), WEEKLY_TREND_DAYS);
        assert_eq!(snap.weekly_trends.dates[0], NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());
        assert_eq!(snap.weekly_trends.series(Nutrient::Calories), &[400.0, 500.0, 600.0, 700.0, 800.0, 900.0, 1000.0]);
        assert_eq!(snap.weekly_trends.series(Nutrient::Fat).len(), WEEKLY_TREND_DAYS);

        let short = snapshot_of(&logs[..3]);
        assert_eq!(short.weekly_trends.calories, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let logs = vec![
            log("2024-06-08T09:00:00Z", "Yogurt", MealType::Breakfast, 123.456),
            log("2024-06-09T13:00:00Z", "Wrap", MealType::Lunch, 612.1),
            log("2024-06-10T20:00:00Z", "Yogurt", MealType::Snack, 123.456),
        ];
        let a = snapshot_of(&logs);
        let b = snapshot_of(&logs);
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn test_insights_override_replaces_averages_and_flags_divergence() {
        let logs = vec![log("2024-06-10T12:00:00Z", "Bowl", MealType::Lunch, 1000.0)];
        let mut snap = snapshot_of(&logs);

        let mut today_totals = BTreeMap::new();
        today_totals.insert("calories".to_string(), 1500.0);
        let insights = DailyInsights { today_totals, ..Default::default() };

        apply_insights_override(&mut snap, &insights, &Goals::default());
        assert!(snap.insights_override_applied);
        assert_eq!(snap.daily_averages.calories, 1500.0);
        // Nutrients the summary doesn't report keep the local value
        assert_eq!(snap.daily_averages.protein, 50.0);
        assert_eq!(snap.adherence_stats.calorie_goal_adherence, 75.0);

        let discrepancy = snap.insights_discrepancy.unwrap();
        assert_eq!(discrepancy.local.calories, 1000.0);
        assert_eq!(discrepancy.upstream.calories, 1500.0);
        assert_eq!(discrepancy.max_abs_difference, 500.0);
    }

    #[test]
    fn test_insights_override_skipped_without_totals() {
        let logs = vec![log("2024-06-10T12:00:00Z", "Bowl", MealType::Lunch, 1000.0)];
        let mut snap = snapshot_of(&logs);
        let before = snap.clone();

        apply_insights_override(&mut snap, &DailyInsights::default(), &Goals::default());
        assert_eq!(snap, before);
    }

    #[test]
    fn test_matching_insights_report_no_discrepancy() {
        let logs = vec![log("2024-06-10T12:00:00Z", "Bowl", MealType::Lunch, 1000.0)];
        let mut snap = snapshot_of(&logs);

        let mut today_totals = BTreeMap::new();
        today_totals.insert("calories".to_string(), 1000.2);
        let insights = DailyInsights { today_totals, ..Default::default() };

        apply_insights_override(&mut snap, &insights, &Goals::default());
        assert!(snap.insights_override_applied);
        assert!(snap.insights_discrepancy.is_none());
    }
}
