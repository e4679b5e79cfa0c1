//! Top-level AgentBay client.

use std::{collections::BTreeMap, sync::Arc};

use agentbay_core::{
    AgentBayError, Config, ContextSync, Result, SyncPolicy,
    context::UploadPolicy,
};
use agentbay_transport::{HttpTransport, VpcRoute};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    context_service::{ContextService, DEFAULT_MAX_RESULTS},
    mobile_simulate::{MobileSimulateConfig, MobileSimulateService},
    session::{Session, SessionIdBody, validate_labels},
};

/// App allow/deny rule for mobile sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppManagerRule {
    /// `White` or `Black`.
    pub rule_type: String,
    pub app_package_name_list: Vec<String>,
}

/// Mobile-specific session settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileExtraConfig {
    #[serde(default)]
    pub lock_resolution: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_manager_rule: Option<AppManagerRule>,
    #[serde(default)]
    pub hide_navigation_bar: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uninstall_blacklist: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulate_config: Option<MobileSimulateConfig>,
}

/// Image-specific session settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraConfigs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<MobileExtraConfig>,
}

/// Parameters for `AgentBay::create`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSessionParams {
    pub image_id: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub context_syncs: Vec<ContextSync>,
    pub is_vpc: bool,
    pub policy_id: Option<String>,
    pub extra_configs: Option<ExtraConfigs>,
}

impl CreateSessionParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_image_id(mut self, image_id: impl Into<String>) -> Self {
        self.image_id = Some(image_id.into());
        self
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_context_sync(mut self, sync: ContextSync) -> Self {
        self.context_syncs.push(sync);
        self
    }

    #[must_use]
    pub const fn with_vpc(mut self, is_vpc: bool) -> Self {
        self.is_vpc = is_vpc;
        self
    }

    #[must_use]
    pub fn with_policy_id(mut self, policy_id: impl Into<String>) -> Self {
        self.policy_id = Some(policy_id.into());
        self
    }

    #[must_use]
    pub fn with_extra_configs(mut self, extra_configs: ExtraConfigs) -> Self {
        self.extra_configs = Some(extra_configs);
        self
    }
}

/// Parameters for `AgentBay::list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSessionParams {
    pub labels: BTreeMap<String, String>,
    pub max_results: Option<u32>,
    pub next_token: Option<String>,
}

/// A created or attached session.
#[derive(Debug)]
pub struct SessionResult {
    pub request_id: String,
    pub session: Session,
}

/// One page of session ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionListResult {
    pub request_id: String,
    pub session_ids: Vec<String>,
    /// Token for the next page; `None` on the last page.
    pub next_token: Option<String>,
    pub max_results: u32,
    /// Matching sessions across all pages.
    pub total_count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PersistenceData {
    context_id: String,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    policy: Option<String>,
}

impl PersistenceData {
    fn from_sync(sync: &ContextSync) -> Result<Self> {
        let policy = sync
            .policy
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AgentBayError::decode("sync policy", &e))?;
        Ok(Self {
            context_id: sync.context_id.clone(),
            path: sync.path.clone(),
            policy,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSessionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    image_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    persistence_data_list: Vec<PersistenceData>,
    vpc_resource: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    mcp_policy_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra_configs: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListSessionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<String>,
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

/// Session fields returned by `CreateMcpSession` and `GetSession`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SessionData {
    success: Option<bool>,
    err_msg: Option<String>,
    session_id: String,
    resource_url: String,
    image_id: String,
    vpc_resource: Option<bool>,
    network_interface_ip: String,
    http_port: String,
    token: String,
}

impl SessionData {
    fn vpc_route(&self, is_vpc: bool) -> Option<VpcRoute> {
        (is_vpc || self.vpc_resource == Some(true)).then(|| VpcRoute {
            network_interface_ip: self.network_interface_ip.clone(),
            http_port: self.http_port.clone(),
            token: self.token.clone(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ListedSession {
    session_id: String,
}

fn labels_json(labels: &BTreeMap<String, String>) -> Result<Option<String>> {
    if labels.is_empty() {
        return Ok(None);
    }
    validate_labels(labels)?;
    serde_json::to_string(labels)
        .map(Some)
        .map_err(|e| AgentBayError::decode("session labels", &e))
}

/// Mount for the simulation context; downloads only, the session never writes it back.
fn simulate_mount(config: &MobileSimulateConfig) -> Option<ContextSync> {
    let context_id = config.simulated_context_id.as_deref()?;
    if !config.simulate || context_id.is_empty() {
        return None;
    }
    let policy = SyncPolicy {
        upload_policy: UploadPolicy {
            auto_upload: false,
            ..UploadPolicy::default()
        },
        ..SyncPolicy::default()
    };
    Some(ContextSync::new(context_id, &config.simulate_path).with_policy(policy))
}

/// Entry point: creates and manages sessions.
///
/// Cheap to clone; clones share one HTTP client.
#[derive(Debug, Clone)]
pub struct AgentBay {
    transport: Arc<HttpTransport>,
}

impl AgentBay {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// Returns `Config` if the API key is missing or the configuration is invalid.
    pub fn new(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        debug!(endpoint = %transport.base_url(), "client created");
        Ok(Self {
            transport: Arc::new(transport),
        })
    }

    /// Create a client configured from the environment.
    ///
    /// # Errors
    /// Returns `Config` if `AGENTBAY_API_KEY` is unset or a variable is malformed.
    pub fn from_env() -> Result<Self> {
        Self::new(&Config::from_env()?)
    }

    /// Create a session.
    ///
    /// VPC sessions resolve their tool list before returning.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for invalid labels or context syncs, or error
    /// if the call fails or returns no session.
    #[instrument(skip(self, params), fields(image_id = ?params.image_id, is_vpc = params.is_vpc))]
    pub async fn create(&self, params: &CreateSessionParams) -> Result<SessionResult> {
        let mut mounts = params.context_syncs.clone();
        if let Some(config) = params
            .extra_configs
            .as_ref()
            .and_then(|c| c.mobile.as_ref())
            .and_then(|m| m.simulate_config.as_ref())
        {
            mounts.extend(simulate_mount(config));
        }

        let mut persistence_data_list = Vec::with_capacity(mounts.len());
        for sync in &mounts {
            sync.validate()?;
            persistence_data_list.push(PersistenceData::from_sync(sync)?);
        }

        let extra_configs = params
            .extra_configs
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AgentBayError::decode("extra configs", &e))?;

        let body = CreateSessionBody {
            image_id: params.image_id.as_deref(),
            labels: labels_json(&params.labels)?,
            persistence_data_list,
            vpc_resource: params.is_vpc,
            mcp_policy_id: params.policy_id.as_deref(),
            extra_configs,
        };

        let response = self.transport.call_action("CreateMcpSession", &body).await?;
        let data: SessionData = response.data_as("created session")?;
        if data.success == Some(false) {
            let message = data
                .err_msg
                .unwrap_or_else(|| "session creation failed".to_string());
            return Err(AgentBayError::remote(message, response.request_id));
        }
        if data.session_id.is_empty() {
            return Err(AgentBayError::decode(
                "created session",
                &"SessionId missing from response data",
            ));
        }

        let session = Session::new(
            Arc::clone(&self.transport),
            data.session_id.as_str(),
            data.resource_url.as_str(),
            params.image_id.clone(),
            data.vpc_route(params.is_vpc),
        );
        if session.is_vpc() {
            session.list_mcp_tools().await?;
        }

        info!(session_id = %session.session_id(), request_id = %response.request_id, "session created");
        Ok(SessionResult {
            request_id: response.request_id,
            session,
        })
    }

    /// Attach to an existing session.
    ///
    /// # Errors
    /// Returns error if the call fails or the session does not exist.
    #[instrument(skip(self))]
    pub async fn get(&self, session_id: &str) -> Result<SessionResult> {
        if session_id.trim().is_empty() {
            return Err(AgentBayError::InvalidArgument(
                "session id cannot be empty".to_string(),
            ));
        }
        let response = self
            .transport
            .call_action("GetSession", &SessionIdBody { session_id })
            .await?;

        let data: SessionData = response.data_as("session")?;
        let id = if data.session_id.is_empty() {
            session_id
        } else {
            data.session_id.as_str()
        };
        // Tools of a VPC session are resolved against its image.
        let image_id = Some(data.image_id.clone()).filter(|image| !image.is_empty());
        let session = Session::new(
            Arc::clone(&self.transport),
            id,
            data.resource_url.as_str(),
            image_id,
            data.vpc_route(false),
        );
        Ok(SessionResult {
            request_id: response.request_id,
            session,
        })
    }

    /// List sessions carrying all of the given labels.
    ///
    /// # Errors
    /// Returns error if the call fails or the page cannot be decoded.
    #[instrument(skip(self, params))]
    pub async fn list(&self, params: &ListSessionParams) -> Result<SessionListResult> {
        let max_results = params.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        let response = self
            .transport
            .call_action("ListSession", &ListSessionBody {
                labels: labels_json(&params.labels)?,
                max_results,
                next_token: params.next_token.as_deref(),
            })
            .await?;

        let listed: Vec<ListedSession> = if response.data.is_null() {
            Vec::new()
        } else {
            response.data_as("session list")?
        };

        Ok(SessionListResult {
            session_ids: listed.into_iter().map(|s| s.session_id).collect(),
            next_token: response.extra_str("NextToken"),
            max_results: response
                .extra_u64("MaxResults")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(max_results),
            total_count: response.extra_u64("TotalCount").unwrap_or_default(),
            request_id: response.request_id,
        })
    }

    /// Release a session, optionally syncing its contexts first.
    ///
    /// # Errors
    /// Returns error if the release call fails.
    pub async fn delete(&self, session: &Session, sync_context: bool) -> Result<String> {
        session.delete(sync_context).await
    }

    #[must_use]
    pub fn context(&self) -> ContextService {
        ContextService::new(Arc::clone(&self.transport))
    }

    #[must_use]
    pub fn mobile_simulate(&self) -> MobileSimulateService {
        MobileSimulateService::new(Arc::clone(&self.transport))
    }
}
