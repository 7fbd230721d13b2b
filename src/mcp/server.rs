//! DietLens MCP Server Implementation
//!
//! Implements the MCP server with the nutrition history tools.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::history::{Clock, SystemClock, ViewerContext, MAX_WINDOW_DAYS};
use crate::models::Nutrient;
use crate::source::RecordSource;
use crate::tools::history::{self, HistoryRequest};
use crate::tools::status::StatusTracker;

/// DietLens MCP Service
#[derive(Clone)]
pub struct DietLensService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    source: Arc<dyn RecordSource>,
    config: Arc<AppConfig>,
    clock: Arc<dyn Clock>,
    tool_router: ToolRouter<DietLensService>,
}

impl DietLensService {
    pub fn new(config: AppConfig, source: Arc<dyn RecordSource>) -> Self {
        Self::with_clock(config, source, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AppConfig, source: Arc<dyn RecordSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(config.api_url.clone(), config.timezone.clone()))),
            source,
            config: Arc::new(config),
            clock,
            tool_router: Self::tool_router(),
        }
    }

    /// Clock and timezone are read once per call
    fn viewer_context(&self) -> ViewerContext {
        ViewerContext::capture(self.clock.as_ref(), self.config.timezone.as_deref())
    }

    fn history_request(&self, window_days: u32, comparison_days: Option<u32>, metrics: Vec<Nutrient>, limit: Option<u32>) -> Result<HistoryRequest, McpError> {
        Ok(HistoryRequest {
            window_days: check_window_days("window_days", window_days)?,
            comparison_days: comparison_days.map(|days| check_window_days("comparison_days", days)).transpose()?,
            metrics,
            limit: limit.unwrap_or(self.config.history_limit),
            include_deleted: false,
        })
    }
}

// ============================================================================
// Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetNutritionHistoryParams {
    /// Days in the primary window, ending today in the viewer's timezone (1 = today, at most 3650)
    pub window_days: u32,
    /// Optional second window, computed independently of the primary one
    pub comparison_days: Option<u32>,
    /// Metrics to return aligned series for (calories, protein, carbohydrates,
    /// fat, fiber, sugar, sodium). Defaults to all.
    #[serde(default)]
    pub metrics: Vec<String>,
    /// Maximum records to fetch from the API
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetAlignedSeriesParams {
    pub window_days: u32,
    pub comparison_days: Option<u32>,
    pub metric: String,
}

#[derive(Debug, Serialize)]
struct AlignedSeriesResponse {
    timezone: String,
    today: chrono::NaiveDate,
    series: crate::history::AlignedSeries,
}

fn parse_metric(raw: &str) -> Result<Nutrient, McpError> {
    Nutrient::from_str(raw).ok_or_else(|| McpError::invalid_params(format!("Unknown metric: {}", raw), None))
}

fn check_window_days(name: &str, days: u32) -> Result<u32, McpError> {
    if days > MAX_WINDOW_DAYS {
        return Err(McpError::invalid_params(
            format!("{} must be at most {} (got {})", name, MAX_WINDOW_DAYS, days),
            None,
        ));
    }
    Ok(days)
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl DietLensService {
    // --- Status ---

    #[tool(description = "Get the current status of the DietLens service including build info, upstream API, timezone, and process information")]
    async fn dietlens_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        to_json(&tracker.get_status())
    }

    #[tool(description = "Get the viewer timezone used to bucket meals into local days, with its current UTC offset and today's local date")]
    fn get_timezone(&self) -> Result<CallToolResult, McpError> {
        to_json(&history::describe_timezone(&self.viewer_context()))
    }

    // --- History ---

    #[tool(description = "Get nutrition history analytics for the last N local days: daily averages, daily history, meal distribution, weekly trends, goal adherence, and top foods. Optionally computes an independent comparison window and aligned per-day series for overlay charts.")]
    async fn get_nutrition_history(&self, Parameters(p): Parameters<GetNutritionHistoryParams>) -> Result<CallToolResult, McpError> {
        let metrics = p.metrics.iter().map(|m| parse_metric(m)).collect::<Result<Vec<_>, _>>()?;
        let request = self.history_request(p.window_days, p.comparison_days, metrics, p.limit)?;
        let ctx = self.viewer_context();

        let view = history::load_history(self.source.as_ref(), &ctx, &self.config.goals, &request)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        to_json(&view)
    }

    #[tool(description = "Get one metric as per-day values on the primary window's date axis, with comparison values aligned by position within the comparison window")]
    async fn get_aligned_series(&self, Parameters(p): Parameters<GetAlignedSeriesParams>) -> Result<CallToolResult, McpError> {
        let metric = parse_metric(&p.metric)?;
        let request = self.history_request(p.window_days, p.comparison_days, vec![metric], None)?;
        let ctx = self.viewer_context();

        let view = history::load_history(self.source.as_ref(), &ctx, &self.config.goals, &request)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let series = view
            .series
            .into_iter()
            .next()
            .ok_or_else(|| McpError::internal_error("No series computed", None))?;

        to_json(&AlignedSeriesResponse {
            timezone: view.timezone.display_name,
            today: view.today,
            series,
        })
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for DietLensService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "dietlens".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("DietLens Nutrition History".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "DietLens - Timezone-aware nutrition history analytics. \
                 Meals are grouped into the viewer's local days, never UTC days. \
                 get_nutrition_history: averages, trends, adherence, top foods for the last N days \
                 (window_days=1 is today and uses the server's daily summary when available). \
                 Pass comparison_days for a second, independent window. \
                 get_aligned_series: one metric on a shared date axis for overlay charts. \
                 get_timezone: the timezone and local date in use. dietlens_status: service status."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metric() {
        assert_eq!(parse_metric("carbs").unwrap(), Nutrient::Carbohydrates);
        assert_eq!(parse_metric("Protein").unwrap(), Nutrient::Protein);
        assert!(parse_metric("vitamin_c").is_err());
    }

    #[test]
    fn test_check_window_days() {
        assert_eq!(check_window_days("window_days", 1).unwrap(), 1);
        assert_eq!(check_window_days("window_days", MAX_WINDOW_DAYS).unwrap(), MAX_WINDOW_DAYS);
        assert!(check_window_days("window_days", MAX_WINDOW_DAYS + 1).is_err());
        assert!(check_window_days("comparison_days", 200_000_000).is_err());
    }
}
