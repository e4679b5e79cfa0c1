//! Transport layer for the AgentBay service.
//!
//! Provides:
//! - Wire protocol (action envelope, MCP tool results, VPC route)
//! - HTTP transport that authenticates requests and parses envelopes

pub mod http;
pub mod protocol;

pub use http::HttpTransport;
pub use protocol::{ApiResponse, McpToolResult, VpcRoute};
