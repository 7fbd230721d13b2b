//! Daily insights model
//!
//! Server-side summary of today's intake, used to keep the single-day view
//! in step with the dashboard cards.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::nutrition::loose_number;
use super::{Nutrient, Nutrition};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyInsights {
    #[serde(default, deserialize_with = "loose_amounts")]
    pub today_totals: BTreeMap<String, f64>,
    #[serde(default, deserialize_with = "loose_amounts")]
    pub goals: BTreeMap<String, f64>,
    #[serde(default, deserialize_with = "loose_amounts")]
    pub adherence: BTreeMap<String, f64>,
}

impl DailyInsights {
    /// True when the summary carries at least one core nutrient total
    pub fn has_totals(&self) -> bool {
        self.today_totals.keys().any(|k| Nutrient::from_key(k).is_some())
    }

    /// `base` with the nutrients this summary reports swapped in
    pub fn overlay_totals(&self, base: &Nutrition) -> Nutrition {
        base.overlay_amounts(&self.today_totals)
    }
}

/// Keep the entries that hold a number or a numeric string. Null or garbage
/// amounts are dropped, so they never override a local total.
fn loose_amounts<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let serde_json::Value::Object(map) = serde_json::Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .iter()
        .filter_map(|(key, value)| loose_number(value).map(|amount| (key.clone(), amount)))
        .collect())
}
