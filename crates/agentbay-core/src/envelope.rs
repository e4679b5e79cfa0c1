//! Uniform response envelope returned by every remote tool call.

use serde::{Deserialize, Serialize};

use crate::error::{AgentBayError, Result};

/// Envelope returned by a remote tool call.
///
/// When `success` is true `data` is meaningful, otherwise `error_message` is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub success: bool,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub request_id: String,
}

impl ToolResponse {
    /// Successful envelope.
    #[must_use]
    pub fn ok(data: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            success: true,
            data: data.into(),
            error_message: String::new(),
            request_id: request_id.into(),
        }
    }

    /// Failed envelope.
    #[must_use]
    pub fn failed(error_message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            success: false,
            data: String::new(),
            error_message: error_message.into(),
            request_id: request_id.into(),
        }
    }

    /// Convert into the payload of a successful call or a remote error.
    ///
    /// # Errors
    /// Returns `AgentBayError::Remote` when the envelope reports failure.
    pub fn into_result(self) -> Result<ToolOutput> {
        if self.success {
            Ok(ToolOutput {
                request_id: self.request_id,
                data: self.data,
            })
        } else {
            let message = if self.error_message.is_empty() {
                "remote tool call failed without an error message".to_string()
            } else {
                self.error_message
            };
            Err(AgentBayError::remote(message, self.request_id))
        }
    }
}

/// Payload of a successful tool call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub request_id: String,
    pub data: String,
}

impl ToolOutput {
    /// Parse `data` as JSON.
    ///
    /// # Errors
    /// Returns `AgentBayError::Decode` if `data` is not valid JSON for `T`.
    pub fn parse_json<T: serde::de::DeserializeOwned>(&self, what: &str) -> Result<T> {
        serde_json::from_str(&self.data).map_err(|e| AgentBayError::decode(what, &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_exposes_data() {
        let output = ToolResponse::ok("X", "R").into_result().unwrap();
        assert_eq!(output.data, "X");
        assert_eq!(output.request_id, "R");
    }

    #[test]
    fn test_failed_envelope_surfaces_message() {
        let err = ToolResponse::failed("E", "R").into_result().unwrap_err();
        assert!(err.to_string().contains('E'));
        assert_eq!(err.request_id(), Some("R"));
    }

    #[test]
    fn test_failed_envelope_without_message() {
        let err = ToolResponse::failed("", "R").into_result().unwrap_err();
        assert!(err.to_string().contains("without an error message"));
    }

    #[test]
    fn test_envelope_wire_names() {
        let json = serde_json::to_value(ToolResponse::failed("E", "R")).unwrap();
        assert_eq!(json["errorMessage"], "E");
        assert_eq!(json["requestId"], "R");
        assert_eq!(json["success"], false);
    }

    #[test]
    fn test_parse_json_decode_error() {
        let output = ToolOutput {
            request_id: "R".into(),
            data: "not json".into(),
        };
        let err = output.parse_json::<Vec<String>>("window list").unwrap_err();
        assert!(err.to_string().starts_with("Failed to decode window list"));
    }
}
