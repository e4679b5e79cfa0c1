//! Persistent context model and the declarative sync policy.
//!
//! The policy is inert configuration: it is serialized and handed to the
//! service at session creation, nothing on the client interprets it.

use serde::{Deserialize, Serialize};

use crate::error::{AgentBayError, Result};

/// A named persistent storage unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub name: String,
    pub state: String,
    pub created_at: Option<String>,
    pub last_used_at: Option<String>,
    pub os_type: Option<String>,
}

impl Context {
    /// Create a context value with id and name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: "available".to_string(),
            ..Self::default()
        }
    }
}

/// When uploads from the session to the context happen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStrategy {
    #[default]
    UploadBeforeResourceRelease,
    PeriodicUpload,
}

/// How downloads from the context into the session happen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadStrategy {
    #[default]
    DownloadAsync,
}

/// Upload policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPolicy {
    pub auto_upload: bool,
    pub upload_strategy: UploadStrategy,
    /// Upload period in minutes, only meaningful for `PeriodicUpload`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            auto_upload: true,
            upload_strategy: UploadStrategy::UploadBeforeResourceRelease,
            period: None,
        }
    }
}

impl UploadPolicy {
    /// Periodic upload every `minutes`.
    #[must_use]
    pub const fn periodic(minutes: u32) -> Self {
        Self {
            auto_upload: true,
            upload_strategy: UploadStrategy::PeriodicUpload,
            period: Some(minutes),
        }
    }
}

/// Download policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadPolicy {
    pub auto_download: bool,
    pub download_strategy: DownloadStrategy,
}

impl Default for DownloadPolicy {
    fn default() -> Self {
        Self {
            auto_download: true,
            download_strategy: DownloadStrategy::DownloadAsync,
        }
    }
}

/// Delete policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePolicy {
    /// Propagate local deletions to the context.
    pub sync_local_file: bool,
}

impl Default for DeletePolicy {
    fn default() -> Self {
        Self {
            sync_local_file: true,
        }
    }
}

/// Archive extraction policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractPolicy {
    pub extract: bool,
    pub delete_src_file: bool,
    pub extract_current_folder: bool,
}

impl Default for ExtractPolicy {
    fn default() -> Self {
        Self {
            extract: true,
            delete_src_file: true,
            extract_current_folder: false,
        }
    }
}

/// An included path with its excluded sub-paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhiteList {
    pub path: String,
    #[serde(default)]
    pub exclude_paths: Vec<String>,
}

/// Include/exclude path lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BwList {
    pub white_lists: Vec<WhiteList>,
}

impl Default for BwList {
    fn default() -> Self {
        Self {
            white_lists: vec![WhiteList::default()],
        }
    }
}

/// Complete sync policy for one context mount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPolicy {
    pub upload_policy: UploadPolicy,
    pub download_policy: DownloadPolicy,
    pub delete_policy: DeletePolicy,
    pub extract_policy: ExtractPolicy,
    pub bw_list: BwList,
}

impl SyncPolicy {
    /// Check the policy before it is sent.
    ///
    /// # Errors
    /// Returns error if a white-list or exclude path contains a wildcard,
    /// or a periodic upload has no positive period.
    pub fn validate(&self) -> Result<()> {
        if self.upload_policy.upload_strategy == UploadStrategy::PeriodicUpload
            && self.upload_policy.period.unwrap_or(0) == 0
        {
            return Err(AgentBayError::InvalidArgument(
                "periodic upload requires a positive period".to_string(),
            ));
        }

        for white_list in &self.bw_list.white_lists {
            for path in std::iter::once(&white_list.path).chain(&white_list.exclude_paths) {
                if path.contains(['*', '?']) {
                    return Err(AgentBayError::InvalidArgument(format!(
                        "wildcard patterns are not supported in sync paths: {path}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A context mounted into a session at `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSync {
    pub context_id: String,
    pub path: String,
    pub policy: Option<SyncPolicy>,
}

impl ContextSync {
    /// Mount `context_id` at `path` with the default policy.
    #[must_use]
    pub fn new(context_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            context_id: context_id.into(),
            path: path.into(),
            policy: Some(SyncPolicy::default()),
        }
    }

    /// Replace the policy.
    #[must_use]
    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Check the mount before it is sent.
    ///
    /// # Errors
    /// Returns error if the context id or path is empty or the policy is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.context_id.trim().is_empty() {
            return Err(AgentBayError::InvalidArgument(
                "context sync requires a context id".to_string(),
            ));
        }
        if self.path.trim().is_empty() {
            return Err(AgentBayError::InvalidArgument(
                "context sync requires a mount path".to_string(),
            ));
        }
        self.policy.as_ref().map_or(Ok(()), SyncPolicy::validate)
    }
}
