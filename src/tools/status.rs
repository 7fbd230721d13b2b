//! DietLens Status Tool
//!
//! Provides runtime status information about the DietLens service.

use serde::Serialize;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::history::resolve_timezone;

/// Status response
#[derive(Debug, Clone, Serialize)]
pub struct DietLensStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub build_profile: &'static str,
    pub version: &'static str,
    /// Upstream consumption API
    pub api_base_url: String,
    /// Viewer timezone as it resolves right now
    pub timezone: String,
    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    api_base_url: String,
    preferred_timezone: Option<String>,
}

impl StatusTracker {
    pub fn new(api_base_url: impl Into<String>, preferred_timezone: Option<String>) -> Self {
        Self {
            start_time: Instant::now(),
            api_base_url: api_base_url.into(),
            preferred_timezone,
        }
    }

    /// Get the current status
    pub fn get_status(&self) -> DietLensStatus {
        let build_info = BuildInfo::current();

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));
        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        DietLensStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            build_profile: build_info.profile,
            version: build_info.version,
            api_base_url: self.api_base_url.clone(),
            timezone: resolve_timezone(self.preferred_timezone.as_deref(), chrono::Utc::now()).display_name,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
