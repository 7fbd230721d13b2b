//! Data models
//!
//! Wire records from the consumption API and their normalized forms.

mod insights;
mod nutrition;
mod record;

pub use insights::DailyInsights;
pub use nutrition::{Nutrient, Nutrition};
pub use record::{normalize, ConsumptionRecord, MealLog, MealType, MedicalRating};
