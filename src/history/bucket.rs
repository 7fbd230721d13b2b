//! Daily bucketing
//!
//! Groups records by local date and sums their nutrients.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::ResolvedTimezone;
use crate::models::{MealLog, Nutrition};

/// Totals for every record sharing one local date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: Nutrition,
    pub meals_count: usize,
}

impl DailyBucket {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            totals: Nutrition::zero(),
            meals_count: 0,
        }
    }
}

/// Bucket records by local date, oldest first.
///
/// Records without a parseable timestamp have no local date and are left out.
pub fn bucketize(records: &[&MealLog], timezone: &ResolvedTimezone) -> Vec<DailyBucket> {
    let mut by_date: BTreeMap<NaiveDate, DailyBucket> = BTreeMap::new();

    for record in records {
        let Some(instant) = record.instant else {
            continue;
        };
        let date = timezone.local_date(instant);
        let bucket = by_date.entry(date).or_insert_with(|| DailyBucket::empty(date));
        bucket.totals = bucket.totals + record.nutrition;
        bucket.meals_count += 1;
    }

    by_date.into_values().collect()
}
