//! DietLens Tools module
//!
//! Tool implementations behind the MCP server.

pub mod history;
pub mod status;
