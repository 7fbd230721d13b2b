//! Shared nutrition data structure
//!
//! The seven core nutrients every aggregation works with.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Core nutrient keys, as they appear in the API's `nutritionalInfo` map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nutrient {
    Calories,
    Protein,
    Carbohydrates,
    Fat,
    Fiber,
    Sugar,
    Sodium,
}

impl Nutrient {
    pub const ALL: [Nutrient; 7] = [
        Nutrient::Calories,
        Nutrient::Protein,
        Nutrient::Carbohydrates,
        Nutrient::Fat,
        Nutrient::Fiber,
        Nutrient::Sugar,
        Nutrient::Sodium,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Nutrient::Calories => "calories",
            Nutrient::Protein => "protein",
            Nutrient::Carbohydrates => "carbohydrates",
            Nutrient::Fat => "fat",
            Nutrient::Fiber => "fiber",
            Nutrient::Sugar => "sugar",
            Nutrient::Sodium => "sodium",
        }
    }

    /// Exact core key, as stored in nutrient maps. Aliases are not folded
    /// in, so a map carrying both `calories` and `energy` keeps `calories`.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Nutrient::ALL.into_iter().find(|n| n.as_str().eq_ignore_ascii_case(key))
    }

    /// User-facing metric name, aliases included
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "calories" | "kcal" | "energy" => Some(Nutrient::Calories),
            "protein" => Some(Nutrient::Protein),
            "carbohydrates" | "carbs" | "carb" => Some(Nutrient::Carbohydrates),
            "fat" => Some(Nutrient::Fat),
            "fiber" | "fibre" => Some(Nutrient::Fiber),
            "sugar" | "sugars" => Some(Nutrient::Sugar),
            "sodium" => Some(Nutrient::Sodium),
            _ => None,
        }
    }
}

/// Nutritional totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,       // grams
    pub carbohydrates: f64, // grams
    pub fat: f64,           // grams
    pub fiber: f64,         // grams
    pub sugar: f64,         // grams
    pub sodium: f64,        // milligrams
}

impl Nutrition {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Protein => self.protein,
            Nutrient::Carbohydrates => self.carbohydrates,
            Nutrient::Fat => self.fat,
            Nutrient::Fiber => self.fiber,
            Nutrient::Sugar => self.sugar,
            Nutrient::Sodium => self.sodium,
        }
    }

    pub fn set(&mut self, nutrient: Nutrient, value: f64) {
        let slot = match nutrient {
            Nutrient::Calories => &mut self.calories,
            Nutrient::Protein => &mut self.protein,
            Nutrient::Carbohydrates => &mut self.carbohydrates,
            Nutrient::Fat => &mut self.fat,
            Nutrient::Fiber => &mut self.fiber,
            Nutrient::Sugar => &mut self.sugar,
            Nutrient::Sodium => &mut self.sodium,
        };
        *slot = value;
    }

    pub fn add(&self, other: &Nutrition) -> Self {
        let mut out = Self::zero();
        for n in Nutrient::ALL {
            out.set(n, self.get(n) + other.get(n));
        }
        out
    }

    /// Build from a loosely typed nutrient map.
    ///
    /// Only the seven exact core keys are read; aliases and micronutrients
    /// are ignored. Missing, non-numeric, non-finite and negative
    /// amounts all count as 0, so this never fails.
    pub fn from_loose_map(map: &BTreeMap<String, serde_json::Value>) -> Self {
        let mut out = Self::zero();
        for (key, value) in map {
            if let Some(nutrient) = Nutrient::from_key(key) {
                out.set(nutrient, loose_amount(value));
            }
        }
        out
    }

    /// Copy with every nutrient named in `amounts` replaced.
    ///
    /// Keys that are not core nutrients are ignored.
    pub fn overlay_amounts(&self, amounts: &BTreeMap<String, f64>) -> Self {
        let mut out = *self;
        for (key, value) in amounts {
            if let Some(nutrient) = Nutrient::from_key(key) {
                out.set(nutrient, sanitize(*value));
            }
        }
        out
    }
}

fn sanitize(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

/// A number or a numeric string; `None` for anything else
pub(crate) fn loose_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn loose_amount(value: &serde_json::Value) -> f64 {
    loose_number(value).map(sanitize).unwrap_or(0.0)
}

impl std::ops::Add for Nutrition {
    type Output = Nutrition;

    fn add(self, other: Nutrition) -> Nutrition {
        Nutrition::add(&self, &other)
    }
}

impl std::iter::Sum for Nutrition {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Nutrition::zero(), |acc, n| acc + n)
    }
}
