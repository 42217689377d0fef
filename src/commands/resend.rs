//! Re-submit a previous question from history without re-recording audio.
//!
//! Useful when the upload failed or the server gave a poor answer and the
//! question audio is still retained.

use crate::commands::send::{retain_question_audio, submit_and_deliver};
use crate::config::OvaConfig;
use crate::history::{self, ExchangeStore};
use std::fs;

/// Re-submits the question audio of a previous exchange.
///
/// # Arguments
/// * `index` - Optional exchange index (1 = most recent, None = most recent)
/// * `clipboard` - If true, copy the answer to the clipboard instead of stdout
/// * `output_file` - Optional file path to write the answer to instead of stdout
pub async fn handle_resend(
    index: Option<usize>,
    clipboard: bool,
    output_file: Option<String>,
) -> Result<(), anyhow::Error> {
    tracing::info!("=== ova Resend Command ===");

    let data_dir = history::data_dir()?;
    let mut store = ExchangeStore::new(&data_dir)?;

    let count = store.count()?;
    if count == 0 {
        return Err(anyhow::anyhow!("No exchanges found in history"));
    }

    let index = index.unwrap_or(1);
    let exchange = store.get_exchange_by_recency(index)?.ok_or_else(|| {
        anyhow::anyhow!("Exchange index out of range. Available exchanges: 1-{count}")
    })?;

    let question_path = exchange.question_audio.ok_or_else(|| {
        anyhow::anyhow!(
            "The question audio of exchange #{index} is no longer retained. \
             Only the most recent exchanges keep their audio files."
        )
    })?;

    if !question_path.exists() {
        return Err(anyhow::anyhow!(
            "Audio file not found: {}",
            question_path.display()
        ));
    }

    tracing::info!(
        "Resending question of exchange #{index} ({})",
        exchange.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    let config_data = OvaConfig::load().map_err(|err| {
        tracing::error!("Failed to load configuration: {err}");
        anyhow::anyhow!("Configuration error: {err}")
    })?;

    let wav_bytes = fs::read(&question_path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", question_path.display()))?;

    // The new exchange gets its own copy of the question audio so the
    // retention pruning of either row cannot strand the other.
    let retained = match retain_question_audio(&question_path) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!("Failed to copy question audio for history: {e}");
            None
        }
    };

    submit_and_deliver(&config_data, wav_bytes, retained, clipboard, output_file).await
}
