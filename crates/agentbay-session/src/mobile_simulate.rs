//! Device profile upload for mobile simulation.
//!
//! A device profile (`dev_info.json`) is stored in a context; sessions
//! created with the resulting `MobileSimulateConfig` mount that context and
//! present the simulated device.

use std::sync::Arc;

use agentbay_core::{AgentBayError, ContextSync, Result};
use agentbay_transport::HttpTransport;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::context_service::ContextService;

/// Session path the simulation context is mounted at.
pub const MOBILE_INFO_DEFAULT_PATH: &str = "/data/agentbay_mobile_info";

/// Path of the device profile inside the context.
pub const MOBILE_INFO_FILE_PATH: &str = "/agentbay_mobile_info/dev_info.json";

/// What part of the device profile is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MobileSimulateMode {
    #[default]
    PropertiesOnly,
    SensorsOnly,
    PackagesOnly,
    ServicesOnly,
    All,
}

/// Simulation settings passed to session creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileSimulateConfig {
    pub simulate: bool,
    pub simulate_path: String,
    pub simulate_mode: MobileSimulateMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulated_context_id: Option<String>,
}

/// Context now holding the uploaded device profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MobileSimulateUploadResult {
    pub request_id: String,
    pub mobile_simulate_context_id: String,
}

/// Builds a `MobileSimulateConfig` and uploads device profiles.
#[derive(Debug, Clone)]
pub struct MobileSimulateService {
    transport: Arc<HttpTransport>,
    contexts: ContextService,
    simulate_enable: bool,
    simulate_mode: MobileSimulateMode,
    context_id: Option<String>,
}

impl MobileSimulateService {
    #[must_use]
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self {
            contexts: ContextService::new(Arc::clone(&transport)),
            transport,
            simulate_enable: false,
            simulate_mode: MobileSimulateMode::default(),
            context_id: None,
        }
    }

    pub const fn set_simulate_enable(&mut self, enable: bool) {
        self.simulate_enable = enable;
    }

    pub const fn set_simulate_mode(&mut self, mode: MobileSimulateMode) {
        self.simulate_mode = mode;
    }

    /// Use a context that already holds a device profile.
    pub fn set_simulate_context_id(&mut self, context_id: impl Into<String>) {
        self.context_id = Some(context_id.into());
    }

    #[must_use]
    pub fn get_simulate_config(&self) -> MobileSimulateConfig {
        MobileSimulateConfig {
            simulate: self.simulate_enable,
            simulate_path: MOBILE_INFO_DEFAULT_PATH.to_string(),
            simulate_mode: self.simulate_mode,
            simulated_context_id: self.context_id.clone(),
        }
    }

    /// Store a device profile in a context.
    ///
    /// Uses the context of `context_sync` when given, otherwise creates a
    /// `mobile_sim_<uuid>` context. The context becomes the simulation
    /// context of this service.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for empty or non-JSON content, or error if a
    /// call or the upload fails.
    #[instrument(skip(self, dev_info, context_sync), fields(len = dev_info.len()))]
    pub async fn upload_mobile_info(
        &mut self,
        dev_info: &str,
        context_sync: Option<&ContextSync>,
    ) -> Result<MobileSimulateUploadResult> {
        if dev_info.trim().is_empty() {
            return Err(AgentBayError::InvalidArgument(
                "mobile info content cannot be empty".to_string(),
            ));
        }
        serde_json::from_str::<serde_json::Value>(dev_info).map_err(|e| {
            AgentBayError::InvalidArgument(format!("mobile info content is not valid JSON: {e}"))
        })?;

        let context_id = match context_sync {
            Some(sync) if !sync.context_id.is_empty() => sync.context_id.clone(),
            _ => {
                let name = format!("mobile_sim_{}", uuid::Uuid::new_v4().simple());
                self.contexts.create(&name).await?.context.id
            }
        };

        let upload = self
            .contexts
            .get_file_upload_url(&context_id, MOBILE_INFO_FILE_PATH)
            .await?;
        self.transport
            .put_presigned(&upload.url, dev_info.as_bytes().to_vec())
            .await?;

        info!(%context_id, "mobile info uploaded");
        self.context_id = Some(context_id.clone());
        Ok(MobileSimulateUploadResult {
            request_id: upload.request_id,
            mobile_simulate_context_id: context_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::session::test_support::transport;

    fn transport_for_offline() -> Arc<HttpTransport> {
        let config = agentbay_core::Config::new("akm-0000").with_endpoint("http://127.0.0.1:9");
        Arc::new(HttpTransport::new(&config).unwrap())
    }

    #[test]
    fn test_config_wire_names() {
        let mut service = MobileSimulateService::new(transport_for_offline());
        service.set_simulate_enable(true);
        service.set_simulate_mode(MobileSimulateMode::All);
        service.set_simulate_context_id("ctx-m");

        assert_eq!(
            serde_json::to_value(service.get_simulate_config()).unwrap(),
            json!({
                "simulate": true,
                "simulatePath": "/data/agentbay_mobile_info",
                "simulateMode": "All",
                "simulatedContextId": "ctx-m"
            })
        );
    }

    #[test]
    fn test_rejects_empty_and_invalid_json() {
        let mut service = MobileSimulateService::new(transport_for_offline());
        assert!(matches!(
            tokio_test::block_on(service.upload_mobile_info("  ", None)),
            Err(AgentBayError::InvalidArgument(_))
        ));
        assert!(matches!(
            tokio_test::block_on(service.upload_mobile_info("{not json", None)),
            Err(AgentBayError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_creates_context_and_puts_profile() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/GetContext")
            .match_body(Matcher::PartialJson(json!({"AllowCreate": true})))
            .with_status(200)
            .with_body(r#"{"RequestId":"r-c","Success":true,"Data":{"Id":"ctx-new"}}"#)
            .create_async()
            .await;
        let upload_url = format!("{}/bucket/dev_info.json", server.url());
        let _url = server
            .mock("POST", "/GetContextFileUploadUrl")
            .match_body(Matcher::Json(json!({
                "ContextId": "ctx-new",
                "FilePath": "/agentbay_mobile_info/dev_info.json"
            })))
            .with_status(200)
            .with_body(json!({"RequestId": "r-u", "Success": true, "Data": {"Url": upload_url}}).to_string())
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/bucket/dev_info.json")
            .match_body(r#"{"model":"Pixel"}"#)
            .with_status(200)
            .create_async()
            .await;

        let mut service = MobileSimulateService::new(transport(&server));
        let result = service
            .upload_mobile_info(r#"{"model":"Pixel"}"#, None)
            .await
            .unwrap();

        assert_eq!(result.mobile_simulate_context_id, "ctx-new");
        assert_eq!(result.request_id, "r-u");
        assert_eq!(
            service.get_simulate_config().simulated_context_id.as_deref(),
            Some("ctx-new")
        );
        create.assert_async().await;
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_reuses_sync_context() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/GetContext")
            .expect(0)
            .create_async()
            .await;
        let upload_url = format!("{}/put", server.url());
        let _url = server
            .mock("POST", "/GetContextFileUploadUrl")
            .match_body(Matcher::PartialJson(json!({"ContextId": "ctx-existing"})))
            .with_status(200)
            .with_body(json!({"RequestId": "r-u", "Success": true, "Data": {"Url": upload_url}}).to_string())
            .create_async()
            .await;
        let _put = server.mock("PUT", "/put").with_status(200).create_async().await;

        let sync = ContextSync::new("ctx-existing", MOBILE_INFO_DEFAULT_PATH);
        let mut service = MobileSimulateService::new(transport(&server));
        let result = service
            .upload_mobile_info("{}", Some(&sync))
            .await
            .unwrap();

        assert_eq!(result.mobile_simulate_context_id, "ctx-existing");
        create.assert_async().await;
    }
}
