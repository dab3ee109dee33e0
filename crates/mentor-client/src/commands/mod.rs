//! CLI command implementations.

use anyhow::{Context, Result, bail};

use mentor_client::MentorClient;
use mentor_client::config::ClientConfig;

pub mod auth;
pub mod chat;
pub mod due;
pub mod endpoints;
pub mod sessions;

/// Load the config and build a client from it.
pub async fn load_client(config_path: &str) -> Result<MentorClient> {
    let config = ClientConfig::load(config_path)
        .await
        .with_context(|| format!("Failed to load config '{}'", config_path))?;
    MentorClient::from_config(&config).context("Failed to create client")
}

/// Fail early when no session is stored.
pub async fn require_login(client: &MentorClient) -> Result<()> {
    if client.session().snapshot().await.is_authenticated() {
        return Ok(());
    }
    bail!("Not logged in. Run `mentor login --email <EMAIL>` first.")
}
