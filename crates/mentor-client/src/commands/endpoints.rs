//! Print the endpoint candidates.

use anyhow::Result;

pub async fn run(config_path: &str) -> Result<()> {
    let client = super::load_client(config_path).await?;

    for (index, base) in client.endpoints().resolve_candidates().iter().enumerate() {
        let marker = if index == 0 { " (primary)" } else { "" };
        println!("{}. {}{}", index + 1, base, marker);
    }
    Ok(())
}
