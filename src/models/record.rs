//! Consumption record model
//!
//! `ConsumptionRecord` is the wire shape returned by the consumption API.
//! `MealLog` is the normalized form every pipeline stage works on.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::Nutrition;
use crate::history::timezone::parse_timestamp;

const UNKNOWN_FOOD: &str = "Unknown";

/// Meal type enum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    #[default]
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }

    /// Free text is tolerated; anything unrecognized is a snack.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => MealType::Breakfast,
            "lunch" => MealType::Lunch,
            "dinner" => MealType::Dinner,
            _ => MealType::Snack,
        }
    }
}

/// Medical suitability ratings attached by the analysis service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRating {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub diabetes_suitability: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One logged meal or snack, exactly as fetched.
///
/// Every field is optional on the wire: legacy rows miss whole sections and
/// a malformed field must not take the rest of the history down with it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionRecord {
    #[serde(default, deserialize_with = "id_from_any")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub food_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub estimated_portion: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,
    /// Nutrient name to amount; micronutrients are kept for display
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub nutritional_info: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub medical_rating: Option<MedicalRating>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub deletion_reason: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Normalized record. Built once at ingestion; the pipeline never looks at
/// the wire shape again.
#[derive(Debug, Clone, PartialEq)]
pub struct MealLog {
    pub id: String,
    /// `None` when the raw timestamp could not be parsed
    pub instant: Option<DateTime<Utc>>,
    pub raw_timestamp: String,
    pub food_name: String,
    pub meal_type: MealType,
    pub nutrition: Nutrition,
    pub diabetes_suitable: bool,
    pub deleted: bool,
}

impl MealLog {
    pub fn from_record(record: &ConsumptionRecord) -> Self {
        let instant = match parse_timestamp(&record.timestamp) {
            Ok(instant) => Some(instant),
            Err(e) => {
                tracing::warn!(record_id = %record.id, error = %e, "record timestamp is not parseable, excluding it from daily views");
                None
            }
        };

        let food_name = record
            .food_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(UNKNOWN_FOOD)
            .to_string();

        let diabetes_suitable = record
            .medical_rating
            .as_ref()
            .and_then(|r| r.diabetes_suitability.as_deref())
            .map(|s| s.trim().eq_ignore_ascii_case("suitable"))
            .unwrap_or(false);

        Self {
            id: record.id.clone(),
            instant,
            raw_timestamp: record.timestamp.clone(),
            food_name,
            meal_type: record.meal_type.as_deref().map(MealType::from_str).unwrap_or_default(),
            nutrition: record
                .nutritional_info
                .as_ref()
                .map(Nutrition::from_loose_map)
                .unwrap_or_default(),
            diabetes_suitable,
            deleted: record.deleted_at.as_deref().is_some_and(|s| !s.trim().is_empty()),
        }
    }
}

/// Normalize a fetched history in one pass
pub fn normalize(records: &[ConsumptionRecord]) -> Vec<MealLog> {
    records.iter().map(MealLog::from_record).collect()
}

/// Deserialize anything, keeping it only if it has the expected shape
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::<D, String>(deserializer)?.unwrap_or_default())
}

/// Ids are opaque: the API has sent both strings and integers
fn id_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_meal_type_defaults_to_snack() {
        assert_eq!(MealType::from_str("Breakfast"), MealType::Breakfast);
        assert_eq!(MealType::from_str(" dinner "), MealType::Dinner);
        assert_eq!(MealType::from_str("brunch"), MealType::Snack);
        assert_eq!(MealType::from_str(""), MealType::Snack);
    }

    #[test]
    fn test_record_tolerates_legacy_shapes() {
        let record: ConsumptionRecord = serde_json::from_value(json!({
            "id": 17,
            "timestamp": "2024-06-01T12:00:00Z",
            "foodName": "Oatmeal",
            "mealType": 3,
            "nutritionalInfo": "n/a",
            "medicalRating": { "diabetesSuitability": "Suitable", "heartHealth": "good" },
            "imageUrl": "https://example.invalid/oat.jpg"
        }))
        .unwrap();

        assert_eq!(record.id, "17");
        assert!(record.meal_type.is_none());
        assert!(record.nutritional_info.is_none());
        assert!(record.extra.contains_key("imageUrl"));

        let log = MealLog::from_record(&record);
        assert_eq!(log.meal_type, MealType::Snack);
        assert_eq!(log.nutrition, Nutrition::zero());
        assert!(log.diabetes_suitable);
        assert!(log.instant.is_some());
        assert!(!log.deleted);
    }

    #[test]
    fn test_normalize_flags_invalid_and_deleted() {
        let records: Vec<ConsumptionRecord> = serde_json::from_value(json!([
            { "id": "a", "timestamp": "yesterday-ish", "foodName": "Toast" },
            { "id": "b", "timestamp": "2024-06-01T08:00:00", "deletedAt": "2024-06-02T00:00:00Z",
              "deletionReason": "duplicate" },
            { "id": "c" }
        ]))
        .unwrap();

        let logs = normalize(&records);
        assert_eq!(logs.len(), 3);
        assert!(logs[0].instant.is_none());
        assert_eq!(logs[0].food_name, "Toast");
        assert!(logs[1].instant.is_some());
        assert!(logs[1].deleted);
        assert_eq!(logs[2].food_name, UNKNOWN_FOOD);
        assert!(logs[2].instant.is_none());
    }
}
