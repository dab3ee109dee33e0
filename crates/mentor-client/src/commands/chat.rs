//! Send one message and stream the reply.

use std::io::Write;

use anyhow::{Context, Result};
use futures::StreamExt;
use tracing::warn;

use mentor_client::stream::StreamEvent;

pub async fn run(config_path: &str, session_id: &str, text: &str) -> Result<()> {
    let client = super::load_client(config_path).await?;
    super::require_login(&client).await?;

    let mut events = client
        .stream_chat(session_id, text)
        .await
        .context("Failed to open chat stream")?;

    let mut stdout = std::io::stdout();
    while let Some(event) = events.next().await {
        match event.context("Chat stream interrupted")? {
            StreamEvent::Correction(correction) => {
                if correction.meta.changed {
                    println!("Corrected: {}", correction.corrected_text);
                    if !correction.meta.notes.is_empty() {
                        println!("Notes: {}", correction.meta.notes);
                    }
                    println!();
                }
            }
            StreamEvent::Chunk(text) => {
                print!("{text}");
                stdout.flush()?;
            }
            StreamEvent::Done { .. } => {}
        }
    }
    println!();

    let reply = events.reply();
    if reply.assistant_message_id.is_empty() {
        warn!("Stream ended without a final reply; run `mentor sessions` to reconcile");
    } else if reply.full_reply != events.streamed_text() {
        // Server text wins when chunks were lost.
        println!("{}", reply.full_reply);
    }
    Ok(())
}
