//! Core abstractions for the AgentBay client SDK.
//!
//! This crate provides the fundamental building blocks:
//! - `ToolCaller` - The one capability every feature wrapper depends on
//! - `ToolResponse` - Uniform success/data/error/request-id envelope
//! - `AgentBayError` - Error type shared by every crate
//! - `Config` - API key, endpoint and timeout resolution
//! - Context and sync-policy data model
//! - API key redaction for logs and error messages

pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod sanitize;
pub mod traits;
pub mod version;

pub use config::Config;
pub use context::{Context, ContextSync, SyncPolicy};
pub use envelope::{ToolOutput, ToolResponse};
pub use error::{AgentBayError, Result};
pub use traits::{ToolCaller, ToolRequest, invoke};
pub use version::VERSION;
