//! A live cloud session.

use std::{
    collections::BTreeMap,
    ops::RangeInclusive,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use agentbay_core::{AgentBayError, Result, ToolCaller, ToolResponse};
use agentbay_tools::{
    ApplicationManager, Code, Command, Computer, FileSystem, Mobile, Oss, WindowManager,
};
use agentbay_transport::{HttpTransport, VpcRoute, protocol::decode_value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::{
    browser::{Browser, BrowserState},
    context_manager::{ContextManager, ContextSyncParams},
};

/// Image used to resolve tools when the session was not created with one.
pub const DEFAULT_IMAGE_ID: &str = "linux_latest";

/// Ports `get_link` may expose.
pub const LINK_PORT_RANGE: RangeInclusive<u16> = 30100..=30199;

/// Action body carrying only the session id.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SessionIdBody<'a> {
    pub session_id: &'a str,
}

/// A tool exposed by one of the session's MCP servers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: Value,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub tool: String,
}

/// Tools available on the session's image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct McpToolsResult {
    pub request_id: String,
    pub tools: Vec<McpTool>,
}

/// Labels currently attached to a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelsResult {
    pub request_id: String,
    pub labels: BTreeMap<String, String>,
}

/// Access URL for a session port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkResult {
    pub request_id: String,
    pub url: String,
}

/// Connection details of a session's remote desktop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub request_id: String,
    pub session_id: String,
    pub resource_url: String,
    pub app_id: String,
    pub auth_code: String,
    pub connection_properties: String,
    pub resource_id: String,
    pub resource_type: String,
    pub ticket: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DesktopInfo {
    app_id: String,
    auth_code: String,
    connection_properties: String,
    resource_id: String,
    resource_type: String,
    ticket: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct McpResourceData {
    session_id: String,
    resource_url: String,
    desktop_info: Option<DesktopInfo>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListMcpToolsBody<'a> {
    image_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SetLabelBody<'a> {
    session_id: &'a str,
    labels: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetLinkBody<'a> {
    session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    protocol_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
}

/// Reject empty label keys or values.
pub(crate) fn validate_labels(labels: &BTreeMap<String, String>) -> Result<()> {
    for (key, value) in labels {
        if key.trim().is_empty() {
            return Err(AgentBayError::InvalidArgument(
                "label keys cannot be empty".to_string(),
            ));
        }
        if value.trim().is_empty() {
            return Err(AgentBayError::InvalidArgument(format!(
                "label value for {key} cannot be empty"
            )));
        }
    }
    Ok(())
}

/// A cloud session.
///
/// Tool calls go through the `CallMcpTool` action, or straight to the
/// session's network interface for VPC sessions.
#[derive(Debug)]
pub struct Session {
    transport: Arc<HttpTransport>,
    session_id: String,
    resource_url: String,
    image_id: Option<String>,
    vpc: Option<VpcRoute>,
    tools: RwLock<Vec<McpTool>>,
    /// Set once `ListMcpTools` has answered, even with an empty list.
    tools_fetched: AtomicBool,
    pub(crate) browser_state: BrowserState,
}

impl Session {
    pub(crate) fn new(
        transport: Arc<HttpTransport>,
        session_id: impl Into<String>,
        resource_url: impl Into<String>,
        image_id: Option<String>,
        vpc: Option<VpcRoute>,
    ) -> Self {
        Self {
            transport,
            session_id: session_id.into(),
            resource_url: resource_url.into(),
            image_id,
            vpc,
            tools: RwLock::new(Vec::new()),
            tools_fetched: AtomicBool::new(false),
            browser_state: BrowserState::default(),
        }
    }

    /// Id of the session on the service.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    /// Image the session runs, when known; tool lists fall back to `DEFAULT_IMAGE_ID`.
    #[must_use]
    pub fn image_id(&self) -> Option<&str> {
        self.image_id.as_deref()
    }

    #[must_use]
    pub const fn is_vpc(&self) -> bool {
        self.vpc.is_some()
    }

    /// Tools resolved so far by `list_mcp_tools`.
    #[must_use]
    pub fn tools(&self) -> Vec<McpTool> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    /// Fetch the tool list of the session's image and keep it for routing.
    ///
    /// # Errors
    /// Returns error if the call fails or the list cannot be decoded.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn list_mcp_tools(&self) -> Result<McpToolsResult> {
        let image_id = self.image_id.as_deref().unwrap_or(DEFAULT_IMAGE_ID);
        let response = self
            .transport
            .call_action("ListMcpTools", &ListMcpToolsBody { image_id })
            .await?;

        let tools: Vec<McpTool> = if response.data.is_null() {
            Vec::new()
        } else {
            response.data_as("MCP tool list")?
        };
        debug!(count = tools.len(), "resolved MCP tools");

        *self.tools.write().unwrap_or_else(PoisonError::into_inner) = tools.clone();
        self.tools_fetched.store(true, Ordering::Release);
        Ok(McpToolsResult {
            request_id: response.request_id,
            tools,
        })
    }

    fn tools_fetched(&self) -> bool {
        self.tools_fetched.load(Ordering::Acquire)
    }

    fn cached_server(&self, tool: &str) -> Option<String> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|t| t.name == tool)
            .map(|t| t.server.clone())
    }

    async fn server_for(&self, tool: &str) -> Result<String> {
        if !self.tools_fetched() {
            self.list_mcp_tools().await?;
        }
        self.cached_server(tool).ok_or_else(|| {
            AgentBayError::InvalidArgument(format!("no MCP server provides tool {tool}"))
        })
    }

    /// Replace the session's labels.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for empty or blank labels, or error if the call fails.
    #[instrument(skip(self, labels), fields(session_id = %self.session_id))]
    pub async fn set_labels(&self, labels: &BTreeMap<String, String>) -> Result<String> {
        if labels.is_empty() {
            return Err(AgentBayError::InvalidArgument(
                "labels cannot be empty".to_string(),
            ));
        }
        validate_labels(labels)?;

        let labels = serde_json::to_string(labels)
            .map_err(|e| AgentBayError::decode("session labels", &e))?;
        let response = self
            .transport
            .call_action("SetLabel", &SetLabelBody {
                session_id: &self.session_id,
                labels,
            })
            .await?;
        Ok(response.request_id)
    }

    /// # Errors
    /// Returns error if the call fails or the labels cannot be decoded.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn get_labels(&self) -> Result<LabelsResult> {
        let response = self
            .transport
            .call_action("GetLabel", &SessionIdBody {
                session_id: &self.session_id,
            })
            .await?;

        let labels = match response.data.get("Labels") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::String(raw)) if raw.is_empty() => BTreeMap::new(),
            Some(raw) => decode_value(raw, "session labels")?,
        };
        Ok(LabelsResult {
            request_id: response.request_id,
            labels,
        })
    }

    /// Remote desktop connection details.
    ///
    /// # Errors
    /// Returns error if the call fails or the resource cannot be decoded.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn info(&self) -> Result<SessionInfo> {
        let response = self
            .transport
            .call_action("GetMcpResource", &SessionIdBody {
                session_id: &self.session_id,
            })
            .await?;
        let data: McpResourceData = response.data_as("session resource")?;
        let desktop = data.desktop_info.unwrap_or_default();

        Ok(SessionInfo {
            request_id: response.request_id,
            session_id: data.session_id,
            resource_url: data.resource_url,
            app_id: desktop.app_id,
            auth_code: desktop.auth_code,
            connection_properties: desktop.connection_properties,
            resource_id: desktop.resource_id,
            resource_type: desktop.resource_type,
            ticket: desktop.ticket,
        })
    }

    /// Public link to a service inside the session.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `port` is outside 30100..=30199, or error
    /// if the call fails.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn get_link(&self, protocol_type: Option<&str>, port: Option<u16>) -> Result<LinkResult> {
        if let Some(port) = port.filter(|p| !LINK_PORT_RANGE.contains(p)) {
            return Err(AgentBayError::InvalidArgument(format!(
                "port {port} is outside {}..={}",
                LINK_PORT_RANGE.start(),
                LINK_PORT_RANGE.end()
            )));
        }

        let response = self
            .transport
            .call_action("GetLink", &GetLinkBody {
                session_id: &self.session_id,
                protocol_type,
                port,
            })
            .await?;

        let url = match &response.data {
            Value::String(url) => url.clone(),
            other => other
                .get("Url")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| AgentBayError::decode("session link", &"Url missing from response data"))?,
        };
        Ok(LinkResult {
            request_id: response.request_id,
            url,
        })
    }

    /// Release the session, optionally syncing its contexts first.
    ///
    /// A failed sync is logged and does not prevent the release.
    ///
    /// # Errors
    /// Returns error if the release call fails.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn delete(&self, sync_context: bool) -> Result<String> {
        if sync_context {
            if let Err(e) = self.context().sync(&ContextSyncParams::default()).await {
                warn!(error = %e, "context sync before release failed");
            }
        }

        let response = self
            .transport
            .call_action("ReleaseMcpSession", &SessionIdBody {
                session_id: &self.session_id,
            })
            .await?;
        info!(request_id = %response.request_id, "session released");
        Ok(response.request_id)
    }

    #[must_use]
    pub const fn command(&self) -> Command<'_, Self> {
        Command::new(self)
    }

    #[must_use]
    pub const fn code(&self) -> Code<'_, Self> {
        Code::new(self)
    }

    #[must_use]
    pub const fn file_system(&self) -> FileSystem<'_, Self> {
        FileSystem::new(self)
    }

    #[must_use]
    pub const fn oss(&self) -> Oss<'_, Self> {
        Oss::new(self)
    }

    #[must_use]
    pub const fn application(&self) -> ApplicationManager<'_, Self> {
        ApplicationManager::new(self)
    }

    #[must_use]
    pub const fn window(&self) -> WindowManager<'_, Self> {
        WindowManager::new(self)
    }

    #[must_use]
    pub const fn computer(&self) -> Computer<'_, Self> {
        Computer::new(self)
    }

    #[must_use]
    pub const fn mobile(&self) -> Mobile<'_, Self> {
        Mobile::new(self)
    }

    #[must_use]
    pub const fn context(&self) -> ContextManager<'_> {
        ContextManager::new(self)
    }

    #[must_use]
    pub const fn browser(&self) -> Browser<'_> {
        Browser::new(self)
    }
}

#[async_trait]
impl ToolCaller for Session {
    async fn call_tool(&self, name: &str, args: Value) -> Result<ToolResponse> {
        match &self.vpc {
            Some(route) => {
                let server = self.server_for(name).await?;
                self.transport
                    .call_vpc_tool(route, &server, name, &args)
                    .await
            }
            None => {
                self.transport
                    .call_mcp_tool(&self.session_id, name, &args)
                    .await
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use agentbay_core::Config;
    use agentbay_transport::{HttpTransport, VpcRoute};

    use super::Session;

    pub const KEY: &str = "akm-0123-abcd";

    pub fn transport(server: &mockito::ServerGuard) -> Arc<HttpTransport> {
        Arc::new(HttpTransport::new(&Config::new(KEY).with_endpoint(server.url())).unwrap())
    }

    pub fn session(server: &mockito::ServerGuard) -> Session {
        Session::new(transport(server), "s-1", "https://res/s-1", None, None)
    }

    pub fn vpc_session(server: &mockito::ServerGuard) -> Session {
        let address = server.host_with_port();
        let (ip, port) = address.rsplit_once(':').unwrap();
        let route = VpcRoute {
            network_interface_ip: ip.to_string(),
            http_port: port.to_string(),
            token: "tok".to_string(),
        };
        Session::new(
            transport(server),
            "s-vpc",
            "",
            Some("imgc-vpc".to_string()),
            Some(route),
        )
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::{test_support::*, *};

    #[tokio::test]
    async fn test_command_goes_through_call_mcp_tool() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/CallMcpTool")
            .match_body(Matcher::PartialJson(json!({
                "SessionId": "s-1",
                "Name": "shell",
                "Args": "{\"command\":\"ls\",\"timeout_ms\":5000}"
            })))
            .with_status(200)
            .with_body(
                r#"{"RequestId":"R","Success":true,"Data":{"content":[{"type":"text","text":"a.txt"}],"isError":false}}"#,
            )
            .create_async()
            .await;

        let session = session(&server);
        let result = session.command().execute_command("ls", 5000).await.unwrap();

        assert_eq!(result.output, "a.txt");
        assert_eq!(result.request_id, "R");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_vpc_session_resolves_server_then_calls_directly() {
        let mut server = mockito::Server::new_async().await;
        let tools = server
            .mock("POST", "/ListMcpTools")
            .match_body(Matcher::PartialJson(json!({"ImageId": "imgc-vpc"})))
            .with_status(200)
            .with_body(
                r#"{"RequestId":"r-t","Success":true,"Data":"[{\"name\":\"shell\",\"description\":\"run\",\"inputSchema\":{},\"server\":\"mcp-server-1\",\"tool\":\"shell\"}]"}"#,
            )
            .expect(1)
            .create_async()
            .await;
        let call = server
            .mock("GET", Matcher::Regex(r"^/callTool(\?.*)?$".to_string()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("server".into(), "mcp-server-1".into()),
                Matcher::UrlEncoded("tool".into(), "shell".into()),
                Matcher::UrlEncoded("token".into(), "tok".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":{"content":[{"type":"text","text":"/root"}],"isError":false}}"#)
            .expect(2)
            .create_async()
            .await;

        let session = vpc_session(&server);
        let first = session.command().execute_command("pwd", 1000).await.unwrap();
        let second = session.command().execute_command("pwd", 1000).await.unwrap();

        assert_eq!(first.output, "/root");
        assert!(second.request_id.starts_with("vpc-"));
        assert_eq!(session.tools()[0].server, "mcp-server-1");
        tools.assert_async().await;
        call.assert_async().await;
    }

    #[tokio::test]
    async fn test_vpc_unknown_tool_is_invalid_argument() {
        let mut server = mockito::Server::new_async().await;
        let _tools = server
            .mock("POST", "/ListMcpTools")
            .with_status(200)
            .with_body(r#"{"RequestId":"r-t","Success":true,"Data":[{"name":"shell","server":"mcp-server-1"}]}"#)
            .create_async()
            .await;

        let session = vpc_session(&server);
        let err = session.mobile().tap(1, 1).await.unwrap_err();
        assert!(matches!(err, AgentBayError::InvalidArgument(_)));
        assert!(err.to_string().contains("tap"));
    }

    #[tokio::test]
    async fn test_vpc_empty_tool_list_is_fetched_once() {
        let mut server = mockito::Server::new_async().await;
        let tools = server
            .mock("POST", "/ListMcpTools")
            .with_status(200)
            .with_body(r#"{"RequestId":"r-t","Success":true,"Data":[]}"#)
            .expect(1)
            .create_async()
            .await;

        let session = vpc_session(&server);
        assert!(session.command().execute_command("pwd", 1000).await.is_err());
        assert!(session.command().execute_command("pwd", 1000).await.is_err());
        assert!(session.tools().is_empty());
        tools.assert_async().await;
    }

    #[tokio::test]
    async fn test_set_labels_rejects_blank_values() {
        let server = mockito::Server::new_async().await;
        let session = session(&server);

        let labels = BTreeMap::from([("env".to_string(), " ".to_string())]);
        let err = session.set_labels(&labels).await.unwrap_err();
        assert!(matches!(err, AgentBayError::InvalidArgument(_)));
        assert!(session.set_labels(&BTreeMap::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_labels_round_trip_through_service() {
        let mut server = mockito::Server::new_async().await;
        let set = server
            .mock("POST", "/SetLabel")
            .match_body(Matcher::Json(json!({
                "SessionId": "s-1",
                "Labels": "{\"env\":\"dev\",\"team\":\"qa\"}"
            })))
            .with_status(200)
            .with_body(r#"{"RequestId":"r-set","Success":true}"#)
            .create_async()
            .await;
        let _get = server
            .mock("POST", "/GetLabel")
            .with_status(200)
            .with_body(r#"{"RequestId":"r-get","Success":true,"Data":{"Labels":"{\"env\":\"dev\"}"}}"#)
            .create_async()
            .await;

        let session = session(&server);
        let labels = BTreeMap::from([
            ("env".to_string(), "dev".to_string()),
            ("team".to_string(), "qa".to_string()),
        ]);
        assert_eq!(session.set_labels(&labels).await.unwrap(), "r-set");
        set.assert_async().await;

        let fetched = session.get_labels().await.unwrap();
        assert_eq!(fetched.labels["env"], "dev");
        assert_eq!(fetched.request_id, "r-get");
    }

    #[tokio::test]
    async fn test_info_reads_desktop_info() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/GetMcpResource")
            .with_status(200)
            .with_body(
                r#"{"RequestId":"r-i","Success":true,"Data":{"SessionId":"s-1","ResourceUrl":"https://res",
                "DesktopInfo":{"AppId":"app","AuthCode":"code","ResourceType":"AIAgent","Ticket":"t"}}}"#,
            )
            .create_async()
            .await;

        let info = session(&server).info().await.unwrap();
        assert_eq!(info.resource_url, "https://res");
        assert_eq!(info.app_id, "app");
        assert_eq!(info.ticket, "t");
        assert_eq!(info.resource_id, "");
    }

    #[tokio::test]
    async fn test_get_link_port_range_and_url() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/GetLink")
            .match_body(Matcher::PartialJson(json!({"ProtocolType": "https", "Port": 30150})))
            .with_status(200)
            .with_body(r#"{"RequestId":"r-l","Success":true,"Data":{"Url":"https://link"}}"#)
            .create_async()
            .await;

        let session = session(&server);
        let err = session.get_link(None, Some(8080)).await.unwrap_err();
        assert!(matches!(err, AgentBayError::InvalidArgument(_)));

        let link = session.get_link(Some("https"), Some(30150)).await.unwrap();
        assert_eq!(link.url, "https://link");
    }

    #[tokio::test]
    async fn test_delete_syncs_then_releases() {
        let mut server = mockito::Server::new_async().await;
        let sync = server
            .mock("POST", "/SyncContext")
            .match_body(Matcher::Json(json!({"SessionId": "s-1"})))
            .with_status(200)
            .with_body(r#"{"RequestId":"r-s","Success":true}"#)
            .create_async()
            .await;
        let release = server
            .mock("POST", "/ReleaseMcpSession")
            .with_status(200)
            .with_body(r#"{"RequestId":"r-d","Success":true}"#)
            .create_async()
            .await;

        let request_id = session(&server).delete(true).await.unwrap();
        assert_eq!(request_id, "r-d");
        sync.assert_async().await;
        release.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_releases_when_sync_fails() {
        let mut server = mockito::Server::new_async().await;
        let _sync = server
            .mock("POST", "/SyncContext")
            .with_status(200)
            .with_body(r#"{"RequestId":"r-s","Success":false,"Message":"sync busy"}"#)
            .create_async()
            .await;
        let release = server
            .mock("POST", "/ReleaseMcpSession")
            .with_status(200)
            .with_body(r#"{"RequestId":"r-d","Success":true}"#)
            .create_async()
            .await;

        assert!(session(&server).delete(true).await.is_ok());
        release.assert_async().await;
    }
}
