//! Context sync status and manual sync for one session.

use agentbay_core::{AgentBayError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, instrument};

use crate::session::Session;

/// Direction of a manual sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Upload,
    Download,
}

/// Filters for `ContextManager::info`; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextInfoParams {
    pub context_id: Option<String>,
    pub path: Option<String>,
    pub task_type: Option<String>,
}

/// Scope of `ContextManager::sync`; unset fields sync every mount.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextSyncParams {
    pub context_id: Option<String>,
    pub path: Option<String>,
    pub mode: Option<SyncMode>,
}

/// Status of one sync task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextStatusData {
    pub context_id: String,
    /// Mount path inside the session.
    pub path: String,
    pub error_message: String,
    /// Task state, such as `Success`, `Failed` or `Running`.
    pub status: String,
    /// Unix seconds; zero while unknown.
    #[serde(deserialize_with = "null_as_zero")]
    pub start_time: i64,
    /// Unix seconds; zero until the task finishes.
    #[serde(deserialize_with = "null_as_zero")]
    pub finish_time: i64,
    /// `upload` or `download`.
    pub task_type: String,
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    Option::<i64>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Sync tasks reported by `GetContextInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextInfoResult {
    pub request_id: String,
    pub context_status_data: Vec<ContextStatusData>,
}

#[derive(Deserialize)]
struct StatusItem {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    data: String,
}

/// Parse the `ContextStatus` field of `GetContextInfo`.
///
/// The field is a JSON array of `{type, data}` items; items of type `data`
/// carry a JSON-encoded array of task statuses.
///
/// # Errors
/// Returns `AgentBayError::Decode` if either layer is malformed.
pub fn parse_context_status(raw: &str) -> Result<Vec<ContextStatusData>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let items: Vec<StatusItem> =
        serde_json::from_str(raw).map_err(|e| AgentBayError::decode("context status", &e))?;

    let mut statuses = Vec::new();
    for item in items.into_iter().filter(|i| i.kind == "data") {
        let mut batch: Vec<ContextStatusData> = serde_json::from_str(&item.data)
            .map_err(|e| AgentBayError::decode("context status data", &e))?;
        statuses.append(&mut batch);
    }
    Ok(statuses)
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetContextInfoBody<'a> {
    session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_type: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SyncContextBody<'a> {
    session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<SyncMode>,
}

/// Context operations bound to one session.
pub struct ContextManager<'a> {
    session: &'a Session,
}

impl<'a> ContextManager<'a> {
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Sync task status for the session's context mounts.
    ///
    /// # Errors
    /// Returns error if the call fails or the status cannot be decoded.
    #[instrument(skip(self, params), fields(session_id = %self.session.session_id()))]
    pub async fn info(&self, params: &ContextInfoParams) -> Result<ContextInfoResult> {
        let response = self
            .session
            .transport()
            .call_action("GetContextInfo", &GetContextInfoBody {
                session_id: self.session.session_id(),
                context_id: params.context_id.as_deref(),
                path: params.path.as_deref(),
                task_type: params.task_type.as_deref(),
            })
            .await?;

        let raw = response
            .data
            .get("ContextStatus")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        let context_status_data = parse_context_status(raw)?;
        debug!(tasks = context_status_data.len(), "context status fetched");

        Ok(ContextInfoResult {
            request_id: response.request_id,
            context_status_data,
        })
    }

    /// Trigger a sync; completion is observed through `info`.
    ///
    /// # Errors
    /// Returns error if the call fails.
    #[instrument(skip(self, params), fields(session_id = %self.session.session_id()))]
    pub async fn sync(&self, params: &ContextSyncParams) -> Result<String> {
        let response = self
            .session
            .transport()
            .call_action("SyncContext", &SyncContextBody {
                session_id: self.session.session_id(),
                context_id: params.context_id.as_deref(),
                path: params.path.as_deref(),
                mode: params.mode,
            })
            .await?;
        Ok(response.request_id)
    }
}
