//! Window management on desktop images.

use agentbay_core::{Result, ToolCaller, ToolRequest, invoke};
use serde::{Deserialize, Serialize};

/// Default timeout for window listing calls in milliseconds.
pub const DEFAULT_WINDOW_TIMEOUT_MS: u64 = 3000;

/// A top-level or child window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Id passed to the window actions.
    pub window_id: i64,
    #[serde(default)]
    pub title: String,
    /// Screen position of the top-left corner, in pixels.
    #[serde(default)]
    pub absolute_upper_left_x: Option<i64>,
    #[serde(default)]
    pub absolute_upper_left_y: Option<i64>,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    /// Owning process.
    #[serde(default)]
    pub pid: Option<i64>,
    #[serde(default)]
    pub pname: Option<String>,
    #[serde(default)]
    pub child_windows: Vec<Window>,
}

/// `list_root_windows` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct ListRootWindowsRequest {
    pub timeout_ms: u64,
}

impl ToolRequest for ListRootWindowsRequest {
    const NAME: &'static str = "list_root_windows";
}

/// `get_active_window` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct GetActiveWindowRequest {
    pub timeout_ms: u64,
}

impl ToolRequest for GetActiveWindowRequest {
    const NAME: &'static str = "get_active_window";
}

macro_rules! window_action {
    ($name:ident, $tool:literal) => {
        #[doc = concat!("`", $tool, "` arguments.")]
        #[derive(Debug, Clone, Serialize)]
        pub struct $name {
            pub window_id: i64,
        }

        impl ToolRequest for $name {
            const NAME: &'static str = $tool;
        }
    };
}

window_action!(ActivateWindowRequest, "activate_window");
window_action!(MaximizeWindowRequest, "maximize_window");
window_action!(MinimizeWindowRequest, "minimize_window");
window_action!(RestoreWindowRequest, "restore_window");
window_action!(CloseWindowRequest, "close_window");
window_action!(FullscreenWindowRequest, "fullscreen_window");

/// `resize_window` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct ResizeWindowRequest {
    pub window_id: i64,
    pub width: u32,
    pub height: u32,
}

impl ToolRequest for ResizeWindowRequest {
    const NAME: &'static str = "resize_window";
}

/// `focus_mode` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct FocusModeRequest {
    pub on: bool,
}

impl ToolRequest for FocusModeRequest {
    const NAME: &'static str = "focus_mode";
}

/// Window management in a session.
///
/// Every mutating call returns the request id of the call.
pub struct WindowManager<'a, C: ?Sized> {
    caller: &'a C,
}

impl<'a, C: ToolCaller + ?Sized> WindowManager<'a, C> {
    #[must_use]
    pub const fn new(caller: &'a C) -> Self {
        Self { caller }
    }

    /// List root windows.
    ///
    /// # Errors
    /// Returns error if the call fails or the listing cannot be decoded.
    pub async fn list_root_windows(&self, timeout_ms: u64) -> Result<Vec<Window>> {
        invoke(self.caller, &ListRootWindowsRequest { timeout_ms })
            .await?
            .parse_json("root windows")
    }

    /// Get the focused window.
    ///
    /// # Errors
    /// Returns error if the call fails or the window cannot be decoded.
    pub async fn get_active_window(&self, timeout_ms: u64) -> Result<Window> {
        invoke(self.caller, &GetActiveWindowRequest { timeout_ms })
            .await?
            .parse_json("active window")
    }

    /// # Errors
    /// Returns error if the call fails or the window does not exist.
    pub async fn activate_window(&self, window_id: i64) -> Result<String> {
        Ok(invoke(self.caller, &ActivateWindowRequest { window_id }).await?.request_id)
    }

    /// # Errors
    /// Returns error if the call fails or the window does not exist.
    pub async fn maximize_window(&self, window_id: i64) -> Result<String> {
        Ok(invoke(self.caller, &MaximizeWindowRequest { window_id }).await?.request_id)
    }

    /// # Errors
    /// Returns error if the call fails or the window does not exist.
    pub async fn minimize_window(&self, window_id: i64) -> Result<String> {
        Ok(invoke(self.caller, &MinimizeWindowRequest { window_id }).await?.request_id)
    }

    /// # Errors
    /// Returns error if the call fails or the window does not exist.
    pub async fn restore_window(&self, window_id: i64) -> Result<String> {
        Ok(invoke(self.caller, &RestoreWindowRequest { window_id }).await?.request_id)
    }

    /// # Errors
    /// Returns error if the call fails or the window does not exist.
    pub async fn close_window(&self, window_id: i64) -> Result<String> {
        Ok(invoke(self.caller, &CloseWindowRequest { window_id }).await?.request_id)
    }

    /// # Errors
    /// Returns error if the call fails or the window does not exist.
    pub async fn fullscreen_window(&self, window_id: i64) -> Result<String> {
        Ok(invoke(self.caller, &FullscreenWindowRequest { window_id }).await?.request_id)
    }

    /// # Errors
    /// Returns error if the call fails or the window does not exist.
    pub async fn resize_window(&self, window_id: i64, width: u32, height: u32) -> Result<String> {
        Ok(invoke(self.caller, &ResizeWindowRequest {
            window_id,
            width,
            height,
        })
        .await?
        .request_id)
    }

    /// Toggle focus mode, which keeps the current window in front.
    ///
    /// # Errors
    /// Returns error if the call fails.
    pub async fn focus_mode(&self, on: bool) -> Result<String> {
        Ok(invoke(self.caller, &FocusModeRequest { on }).await?.request_id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mock::MockCaller;

    #[tokio::test]
    async fn test_list_root_windows_nested() {
        let caller = MockCaller::new().ok(
            r#"[{"window_id":1,"title":"Editor","pid":10,"pname":"code","child_windows":[{"window_id":2,"title":"Find"}]}]"#,
        );
        let windows = WindowManager::new(&caller)
            .list_root_windows(DEFAULT_WINDOW_TIMEOUT_MS)
            .await
            .unwrap();

        assert_eq!(windows[0].title, "Editor");
        assert_eq!(windows[0].child_windows[0].window_id, 2);
        assert_eq!(
            caller.last_call(),
            ("list_root_windows".to_string(), json!({"timeout_ms": 3000}))
        );
    }

    #[tokio::test]
    async fn test_window_actions() {
        let caller = MockCaller::new();
        let windows = WindowManager::new(&caller);
        windows.activate_window(7).await.unwrap();
        windows.maximize_window(7).await.unwrap();
        windows.minimize_window(7).await.unwrap();
        windows.restore_window(7).await.unwrap();
        windows.close_window(7).await.unwrap();
        windows.fullscreen_window(7).await.unwrap();
        windows.resize_window(7, 800, 600).await.unwrap();
        windows.focus_mode(true).await.unwrap();

        let calls = caller.calls();
        let names: Vec<_> = calls.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            [
                "activate_window",
                "maximize_window",
                "minimize_window",
                "restore_window",
                "close_window",
                "fullscreen_window",
                "resize_window",
                "focus_mode"
            ]
        );
        assert_eq!(calls[0].1, json!({"window_id": 7}));
        assert_eq!(calls[6].1, json!({"window_id": 7, "width": 800, "height": 600}));
        assert_eq!(calls[7].1, json!({"on": true}));
    }

    #[tokio::test]
    async fn test_active_window_failure() {
        let caller = MockCaller::new().failed("no active window");
        let err = WindowManager::new(&caller)
            .get_active_window(1000)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no active window");
    }
}
