//! Shell command execution.

use agentbay_core::{AgentBayError, Result, ToolCaller, ToolRequest, invoke};
use serde::Serialize;

/// Default command timeout in milliseconds.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 1000;

/// Arguments of the `shell` tool.
#[derive(Debug, Clone, Serialize)]
pub struct ShellRequest<'a> {
    pub command: &'a str,
    pub timeout_ms: u64,
}

impl ToolRequest for ShellRequest<'_> {
    const NAME: &'static str = "shell";
}

/// Output of a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub request_id: String,
    pub output: String,
}

/// Shell command execution in a session.
pub struct Command<'a, C: ?Sized> {
    caller: &'a C,
}

impl<'a, C: ToolCaller + ?Sized> Command<'a, C> {
    /// Create a command wrapper over a tool caller.
    #[must_use]
    pub const fn new(caller: &'a C) -> Self {
        Self { caller }
    }

    /// Execute a shell command.
    ///
    /// `timeout_ms` is passed through to the remote side.
    ///
    /// # Errors
    /// Returns error if the command is empty, the call fails, or the command fails remotely.
    pub async fn execute_command(&self, command: &str, timeout_ms: u64) -> Result<CommandResult> {
        if command.trim().is_empty() {
            return Err(AgentBayError::InvalidArgument(
                "command must not be empty".to_string(),
            ));
        }

        let output = invoke(self.caller, &ShellRequest {
            command,
            timeout_ms,
        })
        .await?;

        Ok(CommandResult {
            request_id: output.request_id,
            output: output.data,
        })
    }
}
