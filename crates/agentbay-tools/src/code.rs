//! Code execution.

use std::{fmt, str::FromStr};

use agentbay_core::{AgentBayError, Result, ToolCaller, ToolRequest, invoke};
use serde::Serialize;

/// Default code execution timeout in seconds.
pub const DEFAULT_CODE_TIMEOUT_S: u64 = 60;

/// Languages the `run_code` tool accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeLanguage {
    Python,
    Javascript,
}

impl fmt::Display for CodeLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Python => f.write_str("python"),
            Self::Javascript => f.write_str("javascript"),
        }
    }
}

impl FromStr for CodeLanguage {
    type Err = AgentBayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" => Ok(Self::Python),
            "javascript" => Ok(Self::Javascript),
            other => Err(AgentBayError::InvalidArgument(format!(
                "unsupported language: {other}; supported languages are python and javascript"
            ))),
        }
    }
}

/// Arguments of the `run_code` tool.
#[derive(Debug, Clone, Serialize)]
pub struct RunCodeRequest<'a> {
    pub code: &'a str,
    pub language: CodeLanguage,
    pub timeout_s: u64,
}

impl ToolRequest for RunCodeRequest<'_> {
    const NAME: &'static str = "run_code";
}

/// Output of a code execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeExecutionResult {
    pub request_id: String,
    pub result: String,
}

/// Code execution in a session.
pub struct Code<'a, C: ?Sized> {
    caller: &'a C,
}

impl<'a, C: ToolCaller + ?Sized> Code<'a, C> {
    #[must_use]
    pub const fn new(caller: &'a C) -> Self {
        Self { caller }
    }

    /// Run `code` in the named language.
    ///
    /// # Errors
    /// Returns error if the language is unsupported (no call is made),
    /// the call fails, or execution fails remotely.
    pub async fn run_code(
        &self,
        code: &str,
        language: &str,
        timeout_s: u64,
    ) -> Result<CodeExecutionResult> {
        let language = language.parse::<CodeLanguage>()?;
        self.run(code, language, timeout_s).await
    }

    /// Run `code` with an already-parsed language.
    ///
    /// # Errors
    /// Returns error if the call fails or execution fails remotely.
    pub async fn run(
        &self,
        code: &str,
        language: CodeLanguage,
        timeout_s: u64,
    ) -> Result<CodeExecutionResult> {
        let output = invoke(self.caller, &RunCodeRequest {
            code,
            language,
            timeout_s,
        })
        .await?;

        Ok(CodeExecutionResult {
            request_id: output.request_id,
            result: output.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mock::MockCaller;

    #[tokio::test]
    async fn test_run_code_arguments() {
        let caller = MockCaller::new().ok("2\n");

        let result = Code::new(&caller)
            .run_code("print(1 + 1)", "Python", DEFAULT_CODE_TIMEOUT_S)
            .await
            .unwrap();

        assert_eq!(result.result, "2\n");
        assert_eq!(
            caller.last_call(),
            (
                "run_code".to_string(),
                json!({"code": "print(1 + 1)", "language": "python", "timeout_s": 60})
            )
        );
    }

    #[tokio::test]
    async fn test_unsupported_language_makes_no_call() {
        let caller = MockCaller::new();
        let err = Code::new(&caller)
            .run_code("puts 1", "ruby", 10)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("unsupported language: ruby"));
        assert!(caller.calls().is_empty());
    }

    #[test]
    fn test_language_display_round_trip() {
        assert_eq!(CodeLanguage::Javascript.to_string(), "javascript");
        assert_eq!(" JavaScript ".parse::<CodeLanguage>().unwrap(), CodeLanguage::Javascript);
    }

    #[test]
    fn test_remote_error_surfaces() {
        let caller = MockCaller::new().failed("SyntaxError: invalid syntax");
        let err = tokio_test::block_on(Code::new(&caller).run("print(", CodeLanguage::Python, 5))
            .unwrap_err();
        assert!(err.to_string().contains("SyntaxError"));
    }
}
