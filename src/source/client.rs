//! HTTP record source
//!
//! Talks to the consumption API over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use super::RecordSource;
use crate::models::{ConsumptionRecord, DailyInsights};

const HISTORY_PATH: &str = "consumption/history";
const DAILY_INSIGHTS_PATH: &str = "consumption/daily-insights";

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not decode API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// The history endpoint has answered both with a bare list and with a
/// wrapped one
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryBody {
    Bare(Vec<ConsumptionRecord>),
    Wrapped { history: Vec<ConsumptionRecord> },
}

pub(crate) fn parse_history_body(body: &str) -> ApiResult<Vec<ConsumptionRecord>> {
    Ok(match serde_json::from_str::<HistoryBody>(body)? {
        HistoryBody::Bare(records) => records,
        HistoryBody::Wrapped { history } => history,
    })
}

pub(crate) fn parse_insights_body(body: &str) -> ApiResult<Option<DailyInsights>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(serde_json::from_str::<Option<DailyInsights>>(trimmed)?)
}

/// Consumption API client
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> ApiResult<reqwest::Response> {
        let mut request = self.http.get(self.endpoint(path)).query(query);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        tracing::debug!(path, "calling consumption API");
        Ok(request.send().await?)
    }

    async fn error_for(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ApiError::Status { status, body }
    }
}

#[async_trait]
impl RecordSource for ApiClient {
    async fn fetch_history(&self, limit: u32, include_deleted: bool) -> ApiResult<Vec<ConsumptionRecord>> {
        let response = self
            .get(
                HISTORY_PATH,
                &[("limit", limit.to_string()), ("include_deleted", include_deleted.to_string())],
            )
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body = response.text().await?;
        let records = parse_history_body(&body)?;
        tracing::debug!(count = records.len(), "fetched consumption history");
        Ok(records)
    }

    async fn fetch_daily_insights(&self) -> ApiResult<Option<DailyInsights>> {
        let response = self.get(DAILY_INSIGHTS_PATH, &[]).await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => return Ok(None),
            status if !status.is_success() => return Err(Self::error_for(response).await),
            _ => {}
        }

        let body = response.text().await?;
        parse_insights_body(&body)
    }
}
