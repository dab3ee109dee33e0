//! List flashcards due for review.

use anyhow::{Context, Result};

pub async fn run(config_path: &str) -> Result<()> {
    let client = super::load_client(config_path).await?;
    super::require_login(&client).await?;

    let cards = client
        .due_flashcards()
        .await
        .context("Failed to fetch due flashcards")?;

    if cards.is_empty() {
        println!("Nothing due. Come back later.");
        return Ok(());
    }

    for card in cards {
        let translation = card.translation.as_deref().unwrap_or("");
        println!("{}  {}  {}", card.id, card.word, translation);
    }
    Ok(())
}
