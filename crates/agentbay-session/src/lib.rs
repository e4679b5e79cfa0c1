//! AgentBay client and session orchestration.
//!
//! Provides:
//! - `AgentBay` - Create, fetch, list and delete sessions
//! - `Session` - A live cloud session; routes tool calls and exposes feature wrappers
//! - `ContextService` - Persistent context CRUD and file URLs
//! - `ContextManager` - Sync status and manual sync for one session
//! - `Browser` - Browser initialization and CDP endpoint lookup
//! - `MobileSimulateService` - Device profile upload for mobile simulation

pub mod browser;
pub mod client;
pub mod context_manager;
pub mod context_service;
pub mod mobile_simulate;
pub mod session;

pub use browser::{Browser, BrowserOption};
pub use client::{
    AgentBay, CreateSessionParams, ExtraConfigs, ListSessionParams, MobileExtraConfig,
    SessionListResult, SessionResult,
};
pub use context_manager::{ContextInfoParams, ContextManager, ContextSyncParams, SyncMode};
pub use context_service::ContextService;
pub use mobile_simulate::{MobileSimulateConfig, MobileSimulateMode, MobileSimulateService};
pub use session::Session;
