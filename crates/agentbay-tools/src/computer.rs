//! Desktop UI input and screenshots.

use agentbay_core::{AgentBayError, Result, ToolCaller, ToolRequest, invoke};
use serde::Serialize;

/// Mouse button for `click_mouse`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
    DoubleLeft,
}

/// `click_mouse` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct ClickMouseRequest {
    pub x: i32,
    pub y: i32,
    pub button: MouseButton,
}

impl ToolRequest for ClickMouseRequest {
    const NAME: &'static str = "click_mouse";
}

/// `move_mouse` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct MoveMouseRequest {
    pub x: i32,
    pub y: i32,
}

impl ToolRequest for MoveMouseRequest {
    const NAME: &'static str = "move_mouse";
}

/// `input_text` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct InputTextRequest<'a> {
    pub text: &'a str,
}

impl ToolRequest for InputTextRequest<'_> {
    const NAME: &'static str = "input_text";
}

/// `press_keys` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct PressKeysRequest<'a> {
    pub keys: &'a [String],
    pub hold: bool,
}

impl ToolRequest for PressKeysRequest<'_> {
    const NAME: &'static str = "press_keys";
}

/// `system_screenshot` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenshotRequest {}

impl ToolRequest for ScreenshotRequest {
    const NAME: &'static str = "system_screenshot";
}

/// Desktop UI control in a session.
pub struct Computer<'a, C: ?Sized> {
    caller: &'a C,
}

impl<'a, C: ToolCaller + ?Sized> Computer<'a, C> {
    #[must_use]
    pub const fn new(caller: &'a C) -> Self {
        Self { caller }
    }

    /// # Errors
    /// Returns error if the call fails.
    pub async fn click_mouse(&self, x: i32, y: i32, button: MouseButton) -> Result<String> {
        Ok(invoke(self.caller, &ClickMouseRequest { x, y, button }).await?.request_id)
    }

    /// # Errors
    /// Returns error if the call fails.
    pub async fn move_mouse(&self, x: i32, y: i32) -> Result<String> {
        Ok(invoke(self.caller, &MoveMouseRequest { x, y }).await?.request_id)
    }

    /// Type text into the focused element.
    ///
    /// # Errors
    /// Returns error if the call fails.
    pub async fn input_text(&self, text: &str) -> Result<String> {
        Ok(invoke(self.caller, &InputTextRequest { text }).await?.request_id)
    }

    /// Press a key combination, e.g. `["Ctrl", "c"]`.
    ///
    /// # Errors
    /// Returns error if `keys` is empty or the call fails.
    pub async fn press_keys(&self, keys: &[String], hold: bool) -> Result<String> {
        if keys.is_empty() {
            return Err(AgentBayError::InvalidArgument(
                "press_keys requires at least one key".to_string(),
            ));
        }
        Ok(invoke(self.caller, &PressKeysRequest { keys, hold }).await?.request_id)
    }

    /// Take a screenshot; returns its URL.
    ///
    /// # Errors
    /// Returns error if the call fails.
    pub async fn screenshot(&self) -> Result<String> {
        Ok(invoke(self.caller, &ScreenshotRequest {}).await?.data)
    }
}
