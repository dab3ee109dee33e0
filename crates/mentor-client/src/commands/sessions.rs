//! List practice sessions.

use anyhow::{Context, Result};

pub async fn run(config_path: &str) -> Result<()> {
    let client = super::load_client(config_path).await?;
    super::require_login(&client).await?;

    let sessions = client
        .list_sessions()
        .await
        .context("Failed to list sessions")?;

    if sessions.is_empty() {
        println!("No sessions.");
        return Ok(());
    }

    for session in sessions {
        let level = session.cefr_level.as_deref().unwrap_or("-");
        println!("{}  [{}]  {}", session.id, level, session.topic);
    }
    Ok(())
}
