//! The tool-call capability and typed tool requests.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::{
    envelope::{ToolOutput, ToolResponse},
    error::{AgentBayError, Result},
};

/// Capability to invoke a named remote tool.
///
/// `Err` is reserved for calls that could not complete. A failure reported
/// by the remote side comes back as `Ok(ToolResponse { success: false, .. })`.
#[async_trait]
pub trait ToolCaller: Send + Sync {
    /// Invoke `name` with the given JSON arguments.
    async fn call_tool(&self, name: &str, args: Value) -> Result<ToolResponse>;
}

#[async_trait]
impl<T: ToolCaller + ?Sized> ToolCaller for std::sync::Arc<T> {
    async fn call_tool(&self, name: &str, args: Value) -> Result<ToolResponse> {
        (**self).call_tool(name, args).await
    }
}

/// Typed arguments for one remote tool.
///
/// The `Serialize` impl is the mapping from fields to wire argument names.
pub trait ToolRequest: Serialize + Sync {
    /// Tool name the arguments are sent under.
    const NAME: &'static str;
}

/// Send a typed request and unwrap its envelope.
///
/// # Errors
/// Returns `Transport` (prefixed with the tool name) when the call could not
/// complete and `Remote` when the tool reported failure.
pub async fn invoke<C, R>(caller: &C, request: &R) -> Result<ToolOutput>
where
    C: ToolCaller + ?Sized,
    R: ToolRequest,
{
    let args = serde_json::to_value(request)
        .map_err(|e| AgentBayError::decode(format!("arguments for {}", R::NAME), &e))?;
    tracing::debug!(tool = R::NAME, "calling remote tool");

    let response = caller
        .call_tool(R::NAME, args)
        .await
        .map_err(|e| e.with_context(&format!("failed to call tool {}", R::NAME)))?;

    if !response.success {
        tracing::debug!(
            tool = R::NAME,
            request_id = %response.request_id,
            "remote tool reported failure"
        );
    }
    response.into_result()
}
