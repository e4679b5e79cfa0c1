//! HTTP transport for action calls and VPC tool calls.

use agentbay_core::{
    AgentBayError, Config, Result, ToolResponse,
    sanitize::sanitize_url,
    version::user_agent,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::protocol::{ApiResponse, CallMcpToolRequest, McpToolResult, VpcRoute, VpcToolResponse};

/// Authenticated HTTP transport shared by every session.
///
/// Wraps a pooled `reqwest::Client`; cheap to share behind an `Arc`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport from configuration.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(user_agent())
            .build()
            .map_err(|e| AgentBayError::transport("failed to build HTTP client", &e))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
        })
    }

    /// Base URL actions are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call a service action and return its checked envelope.
    ///
    /// Request errors are reported without their URL; query strings and
    /// presigned links carry credentials.
    ///
    /// # Errors
    /// Returns `Transport` if the request fails or the HTTP status is not 2xx,
    /// `Decode` if the body is not an envelope, and `Remote` if the service
    /// reported failure.
    #[instrument(skip(self, body))]
    pub async fn call_action<B>(&self, action: &str, body: &B) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = format!("{}/{action}", self.base_url);
        debug!(url = %sanitize_url(&url), "sending action");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AgentBayError::transport(format!("{action} request failed"), &e.without_url()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| {
                AgentBayError::transport(format!("{action} response unreadable"), &e.without_url())
            })?;

        if !status.is_success() {
            warn!(%status, "action returned error status");
            return Err(AgentBayError::transport(
                format!("{action} returned HTTP {}", status.as_u16()),
                &text,
            ));
        }

        let envelope: ApiResponse = serde_json::from_str(&text)
            .map_err(|e| AgentBayError::decode(format!("{action} response"), &e))?;
        debug!(request_id = %envelope.request_id, "action completed");
        envelope.check()
    }

    /// Invoke an MCP tool through the `CallMcpTool` action.
    ///
    /// A remote-reported failure comes back as an unsuccessful envelope.
    ///
    /// # Errors
    /// Returns error only if the call could not complete or its payload is malformed.
    #[instrument(skip(self, args))]
    pub async fn call_mcp_tool(
        &self,
        session_id: &str,
        name: &str,
        args: &Value,
    ) -> Result<ToolResponse> {
        let body = CallMcpToolRequest {
            session_id,
            name,
            args: args.to_string(),
            auto_gen_session: false,
        };

        match self.call_action("CallMcpTool", &body).await {
            Ok(envelope) => {
                let result = McpToolResult::from_value(&envelope.data)?;
                Ok(result.into_tool_response(envelope.request_id))
            }
            Err(AgentBayError::Remote {
                message,
                request_id,
                ..
            }) => Ok(ToolResponse::failed(message, request_id)),
            Err(e) => Err(e),
        }
    }

    /// Invoke an MCP tool directly on a VPC session.
    ///
    /// # Errors
    /// Returns error if the route is incomplete or the call could not complete.
    #[instrument(skip(self, route, args))]
    pub async fn call_vpc_tool(
        &self,
        route: &VpcRoute,
        server: &str,
        tool: &str,
        args: &Value,
    ) -> Result<ToolResponse> {
        if !route.is_complete() {
            return Err(AgentBayError::InvalidArgument(
                "VPC session has no network interface address".to_string(),
            ));
        }

        let request_id = format!("vpc-{}", uuid::Uuid::new_v4());
        let mut url = Url::parse(&format!("{}/callTool", route.base_url()))
            .map_err(|e| AgentBayError::transport("invalid VPC endpoint", &e))?;
        url.query_pairs_mut()
            .append_pair("server", server)
            .append_pair("tool", tool)
            .append_pair("args", &args.to_string())
            .append_pair("token", &route.token)
            .append_pair("requestId", &request_id);

        debug!(url = %sanitize_url(url.path()), %request_id, "sending VPC tool call");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AgentBayError::transport(format!("VPC call to {tool} failed"), &e.without_url()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| {
                AgentBayError::transport(format!("VPC call to {tool} unreadable"), &e.without_url())
            })?;

        if !status.is_success() {
            return Err(AgentBayError::transport(
                format!("VPC call to {tool} returned HTTP {}", status.as_u16()),
                &text,
            ));
        }

        let body: VpcToolResponse = serde_json::from_str(&text)
            .map_err(|e| AgentBayError::decode("VPC tool response", &e))?;
        let result = McpToolResult::from_value(&body.data)?;
        Ok(result.into_tool_response(request_id))
    }

    /// Upload raw bytes to a presigned URL.
    ///
    /// # Errors
    /// Returns error if the upload fails or the HTTP status is not 2xx.
    #[instrument(skip(self, url, body), fields(len = body.len()))]
    pub async fn put_presigned(&self, url: &str, body: Vec<u8>) -> Result<()> {
        let response = self
            .client
            .put(url)
            .body(body)
            .send()
            .await
            .map_err(|e| AgentBayError::transport("presigned upload failed", &e.without_url()))?;

        let status = response.status();
        if status.is_success() {
            debug!(url = %sanitize_url(url), "presigned upload completed");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(AgentBayError::transport(
            format!("presigned upload returned HTTP {}", status.as_u16()),
            &text,
        ))
    }
}
