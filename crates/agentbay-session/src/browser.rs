//! Browser initialization and CDP endpoint lookup.
//!
//! Driving the browser over CDP is left to the caller; this module only
//! starts it inside the session and returns the endpoint.

use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use agentbay_core::{AgentBayError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::session::{Session, SessionIdBody};

/// Session path browser profiles persist under.
pub const PERSISTENT_PATH: &str = "/tmp/agentbay_browser";

/// Pool size used for `polling` proxies when none is given.
pub const DEFAULT_POLL_SIZE: u32 = 10;

/// Page viewport size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserViewport {
    pub width: u32,
    pub height: u32,
}

impl Default for BrowserViewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Reported screen size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserScreen {
    pub width: u32,
    pub height: u32,
}

impl Default for BrowserScreen {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Constraints for the generated browser fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserFingerprint {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operating_systems: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locales: Vec<String>,
}

/// Where a browser proxy comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    /// A proxy server supplied by the caller.
    Custom,
    /// A proxy from the service's own pool.
    Wuying,
}

/// How a `wuying` proxy picks its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyStrategy {
    /// One fixed address for the whole session.
    Restricted,
    /// Rotate through a pool of `pollsize` addresses.
    Polling,
}

/// Browser proxy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserProxy {
    #[serde(rename = "type")]
    pub proxy_type: ProxyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ProxyStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pollsize: Option<u32>,
}

impl BrowserProxy {
    /// Caller-supplied proxy server.
    #[must_use]
    pub fn custom(server: impl Into<String>) -> Self {
        Self {
            proxy_type: ProxyType::Custom,
            server: Some(server.into()),
            username: None,
            password: None,
            strategy: None,
            pollsize: None,
        }
    }

    /// Service-provided proxy with the given allocation strategy.
    #[must_use]
    pub fn wuying(strategy: ProxyStrategy) -> Self {
        Self {
            proxy_type: ProxyType::Wuying,
            server: None,
            username: None,
            password: None,
            strategy: Some(strategy),
            pollsize: (strategy == ProxyStrategy::Polling).then_some(DEFAULT_POLL_SIZE),
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub const fn with_pollsize(mut self, pollsize: u32) -> Self {
        self.pollsize = Some(pollsize);
        self
    }

    /// # Errors
    /// Returns `InvalidArgument` when the settings required by the proxy type are missing.
    pub fn validate(&self) -> Result<()> {
        match self.proxy_type {
            ProxyType::Custom => {
                if self.server.as_deref().is_none_or(str::is_empty) {
                    return Err(AgentBayError::InvalidArgument(
                        "custom proxy requires a server".to_string(),
                    ));
                }
            }
            ProxyType::Wuying => match self.strategy {
                None => {
                    return Err(AgentBayError::InvalidArgument(
                        "wuying proxy requires a strategy".to_string(),
                    ));
                }
                Some(ProxyStrategy::Polling) if self.pollsize.unwrap_or(0) == 0 => {
                    return Err(AgentBayError::InvalidArgument(
                        "polling proxy requires a pollsize greater than 0".to_string(),
                    ));
                }
                Some(_) => {}
            },
        }
        Ok(())
    }
}

/// Options for starting the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserOption {
    #[serde(default)]
    pub use_stealth: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<BrowserViewport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<BrowserScreen>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<BrowserFingerprint>,
    #[serde(default)]
    pub solve_captchas: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proxies: Vec<BrowserProxy>,
}

impl BrowserOption {
    /// # Errors
    /// Returns `InvalidArgument` for more than one proxy or an incomplete proxy.
    pub fn validate(&self) -> Result<()> {
        if self.proxies.len() > 1 {
            return Err(AgentBayError::InvalidArgument(
                "at most one proxy is supported".to_string(),
            ));
        }
        self.proxies.iter().try_for_each(BrowserProxy::validate)
    }
}

/// Browser state kept on the session.
#[derive(Debug, Default)]
pub(crate) struct BrowserState {
    initialized: AtomicBool,
    option: Mutex<Option<BrowserOption>>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitBrowserBody<'a> {
    session_id: &'a str,
    persistent_path: &'static str,
    browser_option: &'a BrowserOption,
}

/// Browser of one session.
pub struct Browser<'a> {
    session: &'a Session,
}

impl<'a> Browser<'a> {
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Start the browser with `option`.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the options are invalid, or error if the call fails.
    #[instrument(skip(self, option), fields(session_id = %self.session.session_id()))]
    pub async fn initialize(&self, option: BrowserOption) -> Result<String> {
        option.validate()?;

        let response = self
            .session
            .transport()
            .call_action("InitBrowser", &InitBrowserBody {
                session_id: self.session.session_id(),
                persistent_path: PERSISTENT_PATH,
                browser_option: &option,
            })
            .await?;

        let state = &self.session.browser_state;
        *state.option.lock().unwrap_or_else(PoisonError::into_inner) = Some(option);
        state.initialized.store(true, Ordering::Release);
        info!(request_id = %response.request_id, "browser initialized");
        Ok(response.request_id)
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.session.browser_state.initialized.load(Ordering::Acquire)
    }

    /// Options of the last successful `initialize`.
    #[must_use]
    pub fn option(&self) -> Option<BrowserOption> {
        self.session
            .browser_state
            .option
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// CDP endpoint of the running browser.
    ///
    /// # Errors
    /// Returns `InvalidArgument` before `initialize`, or error if the call fails.
    #[instrument(skip(self), fields(session_id = %self.session.session_id()))]
    pub async fn get_endpoint_url(&self) -> Result<String> {
        if !self.is_initialized() {
            return Err(AgentBayError::InvalidArgument(
                "browser is not initialized".to_string(),
            ));
        }

        let response = self
            .session
            .transport()
            .call_action("GetCdpLink", &SessionIdBody {
                session_id: self.session.session_id(),
            })
            .await?;

        match &response.data {
            Value::String(url) => Ok(url.clone()),
            other => other
                .get("Url")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| AgentBayError::decode("CDP link", &"Url missing from response data")),
        }
    }
}
