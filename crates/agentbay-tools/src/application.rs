//! Application management on desktop and mobile images.

use agentbay_core::{Result, ToolCaller, ToolRequest, invoke};
use serde::{Deserialize, Serialize};

/// An installed application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledApp {
    pub name: String,
    /// Command passed to `start_app`.
    #[serde(default)]
    pub start_cmd: String,
    /// Command passed to `stop_app_by_cmd`, when the app has one.
    #[serde(default)]
    pub stop_cmd: Option<String>,
    #[serde(default)]
    pub work_directory: Option<String>,
}

/// A running process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    /// Process name, as accepted by `stop_app_by_pname`.
    pub pname: String,
    pub pid: i64,
    /// Full command line, when the image reports it.
    #[serde(default)]
    pub cmdline: Option<String>,
}

/// `get_installed_apps` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct GetInstalledAppsRequest {
    pub start_menu: bool,
    pub desktop: bool,
    pub ignore_system_apps: bool,
}

impl ToolRequest for GetInstalledAppsRequest {
    const NAME: &'static str = "get_installed_apps";
}

/// `start_app` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct StartAppRequest<'a> {
    pub start_cmd: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_directory: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<&'a str>,
}

impl ToolRequest for StartAppRequest<'_> {
    const NAME: &'static str = "start_app";
}

/// `stop_app_by_pname` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct StopAppByPnameRequest<'a> {
    pub pname: &'a str,
}

impl ToolRequest for StopAppByPnameRequest<'_> {
    const NAME: &'static str = "stop_app_by_pname";
}

/// `stop_app_by_pid` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct StopAppByPidRequest {
    pub pid: i64,
}

impl ToolRequest for StopAppByPidRequest {
    const NAME: &'static str = "stop_app_by_pid";
}

/// `stop_app_by_cmd` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct StopAppByCmdRequest<'a> {
    pub stop_cmd: &'a str,
}

impl ToolRequest for StopAppByCmdRequest<'_> {
    const NAME: &'static str = "stop_app_by_cmd";
}

/// `list_visible_apps` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct ListVisibleAppsRequest {}

impl ToolRequest for ListVisibleAppsRequest {
    const NAME: &'static str = "list_visible_apps";
}

/// Application management in a session.
pub struct ApplicationManager<'a, C: ?Sized> {
    caller: &'a C,
}

impl<'a, C: ToolCaller + ?Sized> ApplicationManager<'a, C> {
    #[must_use]
    pub const fn new(caller: &'a C) -> Self {
        Self { caller }
    }

    /// List installed applications.
    ///
    /// # Errors
    /// Returns error if the call fails or the listing cannot be decoded.
    pub async fn get_installed_apps(
        &self,
        start_menu: bool,
        desktop: bool,
        ignore_system_apps: bool,
    ) -> Result<Vec<InstalledApp>> {
        let output = invoke(self.caller, &GetInstalledAppsRequest {
            start_menu,
            desktop,
            ignore_system_apps,
        })
        .await?;
        output.parse_json("installed applications")
    }

    /// Start an application; `activity` applies to Android images.
    ///
    /// # Errors
    /// Returns error if the call fails or the process list cannot be decoded.
    pub async fn start_app(
        &self,
        start_cmd: &str,
        work_directory: Option<&str>,
        activity: Option<&str>,
    ) -> Result<Vec<Process>> {
        let output = invoke(self.caller, &StartAppRequest {
            start_cmd,
            work_directory,
            activity,
        })
        .await?;
        output.parse_json("started processes")
    }

    /// Stop every process with the given name.
    ///
    /// # Errors
    /// Returns error if the call fails or the stop fails remotely.
    pub async fn stop_app_by_pname(&self, pname: &str) -> Result<String> {
        Ok(invoke(self.caller, &StopAppByPnameRequest { pname })
            .await?
            .request_id)
    }

    /// Stop a process by id.
    ///
    /// # Errors
    /// Returns error if the call fails or the stop fails remotely.
    pub async fn stop_app_by_pid(&self, pid: i64) -> Result<String> {
        Ok(invoke(self.caller, &StopAppByPidRequest { pid }).await?.request_id)
    }

    /// Stop an application with its stop command.
    ///
    /// # Errors
    /// Returns error if the call fails or the stop fails remotely.
    pub async fn stop_app_by_cmd(&self, stop_cmd: &str) -> Result<String> {
        Ok(invoke(self.caller, &StopAppByCmdRequest { stop_cmd })
            .await?
            .request_id)
    }

    /// List applications with visible windows.
    ///
    /// # Errors
    /// Returns error if the call fails or the process list cannot be decoded.
    pub async fn list_visible_apps(&self) -> Result<Vec<Process>> {
        let output = invoke(self.caller, &ListVisibleAppsRequest {}).await?;
        output.parse_json("visible applications")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mock::MockCaller;

    #[tokio::test]
    async fn test_get_installed_apps() {
        let caller = MockCaller::new().ok(
            r#"[{"name":"Google Chrome","start_cmd":"chrome.exe","work_directory":"C:\\"}]"#,
        );
        let apps = ApplicationManager::new(&caller)
            .get_installed_apps(true, false, true)
            .await
            .unwrap();

        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "Google Chrome");
        assert_eq!(apps[0].stop_cmd, None);
        assert_eq!(
            caller.last_call(),
            (
                "get_installed_apps".to_string(),
                json!({"start_menu": true, "desktop": false, "ignore_system_apps": true})
            )
        );
    }

    #[tokio::test]
    async fn test_start_app_with_activity() {
        let caller = MockCaller::new().ok(r#"[{"pname":"com.example","pid":321}]"#);
        let processes = ApplicationManager::new(&caller)
            .start_app("monkey -p com.example", None, Some(".MainActivity"))
            .await
            .unwrap();

        assert_eq!(processes[0].pid, 321);
        assert_eq!(
            caller.last_call().1,
            json!({"start_cmd": "monkey -p com.example", "activity": ".MainActivity"})
        );
    }

    #[tokio::test]
    async fn test_stop_variants() {
        let caller = MockCaller::new();
        let apps = ApplicationManager::new(&caller);
        apps.stop_app_by_pname("chrome").await.unwrap();
        apps.stop_app_by_pid(42).await.unwrap();
        apps.stop_app_by_cmd("pkill chrome").await.unwrap();

        let calls = caller.calls();
        assert_eq!(calls[0], ("stop_app_by_pname".into(), json!({"pname": "chrome"})));
        assert_eq!(calls[1], ("stop_app_by_pid".into(), json!({"pid": 42})));
        assert_eq!(calls[2], ("stop_app_by_cmd".into(), json!({"stop_cmd": "pkill chrome"})));
    }

    #[tokio::test]
    async fn test_undecodable_listing() {
        let caller = MockCaller::new().ok("not json");
        let err = ApplicationManager::new(&caller)
            .list_visible_apps()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("visible applications"));
        assert_eq!(caller.last_call().1, json!({}));
    }
}
