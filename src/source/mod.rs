//! Consumption record source
//!
//! The remote store the history views read from. Only the two calls the
//! analytics need are modelled here.

pub mod client;

use async_trait::async_trait;

use crate::models::{ConsumptionRecord, DailyInsights};

pub use client::{ApiClient, ApiError, ApiResult};

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Most recent records, newest first as far as the server guarantees
    async fn fetch_history(&self, limit: u32, include_deleted: bool) -> ApiResult<Vec<ConsumptionRecord>>;

    /// Server-side summary of today, `None` when the server has none
    async fn fetch_daily_insights(&self) -> ApiResult<Option<DailyInsights>>;
}
