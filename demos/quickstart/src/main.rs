//! Quickstart: create a session, run a command, list a directory, release.
//!
//! Reads `AGENTBAY_API_KEY` (and optionally `AGENTBAY_ENDPOINT`,
//! `AGENTBAY_TIMEOUT_MS`) from the environment.

use agentbay_core::Config;
use agentbay_session::{AgentBay, CreateSessionParams};
use anyhow::Context as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,agentbay_transport=debug".into()),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;
    let agent_bay = AgentBay::new(&config)?;

    let params = CreateSessionParams::new()
        .with_image_id("linux_latest")
        .with_label("source", "quickstart");
    let created = agent_bay.create(&params).await.context("creating session")?;
    let session = created.session;
    tracing::info!(session_id = %session.session_id(), "session ready");

    let result = async {
        let output = session.command().execute_command("uname -a", 5000).await?;
        println!("{}", output.output.trim_end());

        for entry in session.file_system().list_directory("/tmp").await? {
            let marker = if entry.is_directory { "/" } else { "" };
            println!("  {}{marker}", entry.name);
        }
        anyhow::Ok(())
    }
    .await;

    if let Err(e) = agent_bay.delete(&session, false).await {
        tracing::warn!("Failed to release session: {e}");
    }
    result
}
