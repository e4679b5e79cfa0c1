//! Wire protocol for the AgentBay service.

use agentbay_core::{AgentBayError, Result, ToolResponse};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// Envelope of every action call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub http_status_code: Option<u16>,
    #[serde(default)]
    pub data: Value,
    /// Top-level fields beside the envelope, such as `NextToken` or `TotalCount`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ApiResponse {
    /// Fail with a remote error if the service reported `Success: false`.
    ///
    /// # Errors
    /// Returns `AgentBayError::Remote` carrying `Message` (or `Code`) and the request id.
    pub fn check(self) -> Result<Self> {
        if self.success != Some(false) {
            return Ok(self);
        }
        let message = self
            .message
            .clone()
            .filter(|m| !m.is_empty())
            .or_else(|| self.code.clone())
            .unwrap_or_else(|| "request failed without an error message".to_string());
        Err(match self.code {
            Some(code) => AgentBayError::remote_with_code(message, self.request_id, code),
            None => AgentBayError::remote(message, self.request_id),
        })
    }

    /// String value of a top-level field.
    #[must_use]
    pub fn extra_str(&self, field: &str) -> Option<String> {
        self.extra
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Numeric value of a top-level field; numbers sent as strings are accepted.
    #[must_use]
    pub fn extra_u64(&self, field: &str) -> Option<u64> {
        match self.extra.get(field)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Decode `Data` into `T`.
    ///
    /// # Errors
    /// Returns `AgentBayError::Decode` if `Data` does not have the expected shape.
    pub fn data_as<T: DeserializeOwned>(&self, what: &str) -> Result<T> {
        decode_value(&self.data, what)
    }

    /// Decode a field of `Data` that carries JSON encoded as a string.
    ///
    /// # Errors
    /// Returns `AgentBayError::Decode` if the field is missing or malformed.
    pub fn embedded_json<T: DeserializeOwned>(&self, field: &str) -> Result<T> {
        let raw = self
            .data
            .get(field)
            .ok_or_else(|| AgentBayError::decode(field, &"field missing from response data"))?;
        decode_value(raw, field)
    }
}

/// Decode a value that is either the JSON itself or JSON encoded in a string.
///
/// # Errors
/// Returns `AgentBayError::Decode` if neither form parses as `T`.
pub fn decode_value<T: DeserializeOwned>(value: &Value, what: &str) -> Result<T> {
    match value {
        Value::String(raw) => {
            serde_json::from_str(raw).map_err(|e| AgentBayError::decode(what, &e))
        }
        other => T::deserialize(other).map_err(|e| AgentBayError::decode(what, &e)),
    }
}

/// One content item of an MCP tool result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpContent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Result payload of an MCP tool call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolResult {
    #[serde(default)]
    pub content: Vec<McpContent>,
    #[serde(default)]
    pub is_error: bool,
}

impl McpToolResult {
    /// Decode from an object or a JSON string.
    ///
    /// # Errors
    /// Returns `AgentBayError::Decode` if the payload is malformed.
    pub fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        decode_value(value, "tool result")
    }

    /// Text of the first text item.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .find(|c| c.kind == "text" || c.kind.is_empty())
            .and_then(|c| c.text.clone())
            .unwrap_or_default()
    }

    /// Convert into the uniform envelope.
    #[must_use]
    pub fn into_tool_response(self, request_id: impl Into<String>) -> ToolResponse {
        let text = self.text();
        if self.is_error {
            ToolResponse::failed(text, request_id)
        } else {
            ToolResponse::ok(text, request_id)
        }
    }
}

/// `CallMcpTool` action body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallMcpToolRequest<'a> {
    pub session_id: &'a str,
    pub name: &'a str,
    /// Tool arguments encoded as a JSON string.
    pub args: String,
    pub auto_gen_session: bool,
}

/// Direct route into a VPC session.
#[derive(Clone, PartialEq, Eq)]
pub struct VpcRoute {
    pub network_interface_ip: String,
    pub http_port: String,
    pub token: String,
}

impl std::fmt::Debug for VpcRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VpcRoute")
            .field("network_interface_ip", &self.network_interface_ip)
            .field("http_port", &self.http_port)
            .finish_non_exhaustive()
    }
}

impl VpcRoute {
    /// Whether the route has an address to call.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.network_interface_ip.is_empty() && !self.http_port.is_empty()
    }

    /// Base URL of the session's tool endpoint.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.network_interface_ip, self.http_port)
    }
}

/// Response of a VPC direct tool call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VpcToolResponse {
    #[serde(default)]
    pub data: Value,
}
