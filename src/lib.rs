//! DietLens Library
//!
//! Timezone-aware nutrition history analytics over a remote consumption log.

pub mod build_info;
pub mod config;
pub mod history;
pub mod mcp;
pub mod models;
pub mod source;
pub mod tools;
