//! Mobile device input, UI inspection and screenshots.

use agentbay_core::{Result, ToolCaller, ToolRequest, invoke};
use serde::{Deserialize, Serialize};

/// Android key codes accepted by `send_key`.
pub struct KeyCode;

impl KeyCode {
    pub const HOME: i32 = 3;
    pub const BACK: i32 = 4;
    pub const VOLUME_UP: i32 = 24;
    pub const VOLUME_DOWN: i32 = 25;
    pub const POWER: i32 = 26;
    pub const MENU: i32 = 82;
}

/// Default timeout for UI element queries in milliseconds.
pub const DEFAULT_UI_TIMEOUT_MS: u64 = 2000;

/// Element bounds in screen pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default)]
    pub left: i32,
    #[serde(default)]
    pub top: i32,
    #[serde(default)]
    pub right: i32,
    #[serde(default)]
    pub bottom: i32,
}

impl Bounds {
    /// Center point, useful as a tap target.
    #[must_use]
    pub const fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }
}

/// A node of the on-screen UI tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiElement {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub bounds: Option<Bounds>,
    #[serde(default)]
    pub children: Vec<UiElement>,
}

impl UiElement {
    /// Depth-first search for the first element whose text equals `text`.
    #[must_use]
    pub fn find_by_text(&self, text: &str) -> Option<&Self> {
        if self.text == text {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_by_text(text))
    }
}

/// `tap` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct TapRequest {
    pub x: i32,
    pub y: i32,
}

impl ToolRequest for TapRequest {
    const NAME: &'static str = "tap";
}

/// `swipe` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct SwipeRequest {
    pub start_x: i32,
    pub start_y: i32,
    pub end_x: i32,
    pub end_y: i32,
    pub duration_ms: u64,
}

impl ToolRequest for SwipeRequest {
    const NAME: &'static str = "swipe";
}

/// `input_text` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct MobileInputTextRequest<'a> {
    pub text: &'a str,
}

impl ToolRequest for MobileInputTextRequest<'_> {
    const NAME: &'static str = "input_text";
}

/// `send_key` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct SendKeyRequest {
    pub key: i32,
}

impl ToolRequest for SendKeyRequest {
    const NAME: &'static str = "send_key";
}

/// `get_clickable_ui_elements` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct GetClickableUiElementsRequest {
    pub timeout_ms: u64,
}

impl ToolRequest for GetClickableUiElementsRequest {
    const NAME: &'static str = "get_clickable_ui_elements";
}

/// `get_all_ui_elements` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct GetAllUiElementsRequest {
    pub timeout_ms: u64,
}

impl ToolRequest for GetAllUiElementsRequest {
    const NAME: &'static str = "get_all_ui_elements";
}

/// `system_screenshot` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct MobileScreenshotRequest {}

impl ToolRequest for MobileScreenshotRequest {
    const NAME: &'static str = "system_screenshot";
}

/// Mobile device control in a session.
pub struct Mobile<'a, C: ?Sized> {
    caller: &'a C,
}

impl<'a, C: ToolCaller + ?Sized> Mobile<'a, C> {
    #[must_use]
    pub const fn new(caller: &'a C) -> Self {
        Self { caller }
    }

    /// # Errors
    /// Returns error if the call fails.
    pub async fn tap(&self, x: i32, y: i32) -> Result<String> {
        Ok(invoke(self.caller, &TapRequest { x, y }).await?.request_id)
    }

    /// # Errors
    /// Returns error if the call fails.
    pub async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration_ms: u64,
    ) -> Result<String> {
        Ok(invoke(self.caller, &SwipeRequest {
            start_x,
            start_y,
            end_x,
            end_y,
            duration_ms,
        })
        .await?
        .request_id)
    }

    /// # Errors
    /// Returns error if the call fails.
    pub async fn input_text(&self, text: &str) -> Result<String> {
        Ok(invoke(self.caller, &MobileInputTextRequest { text })
            .await?
            .request_id)
    }

    /// Send a key event; see [`KeyCode`].
    ///
    /// # Errors
    /// Returns error if the call fails.
    pub async fn send_key(&self, key: i32) -> Result<String> {
        Ok(invoke(self.caller, &SendKeyRequest { key }).await?.request_id)
    }

    /// Clickable elements on the current screen.
    ///
    /// # Errors
    /// Returns error if the call fails or the elements cannot be decoded.
    pub async fn get_clickable_ui_elements(&self, timeout_ms: u64) -> Result<Vec<UiElement>> {
        invoke(self.caller, &GetClickableUiElementsRequest { timeout_ms })
            .await?
            .parse_json("clickable UI elements")
    }

    /// The full UI tree of the current screen.
    ///
    /// # Errors
    /// Returns error if the call fails or the elements cannot be decoded.
    pub async fn get_all_ui_elements(&self, timeout_ms: u64) -> Result<Vec<UiElement>> {
        invoke(self.caller, &GetAllUiElementsRequest { timeout_ms })
            .await?
            .parse_json("UI elements")
    }

    /// Take a screenshot; returns its URL.
    ///
    /// # Errors
    /// Returns error if the call fails.
    pub async fn screenshot(&self) -> Result<String> {
        Ok(invoke(self.caller, &MobileScreenshotRequest {}).await?.data)
    }
}
