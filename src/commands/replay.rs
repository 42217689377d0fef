//! Replay a previous answer from history using the system audio player.

use crate::config::OvaConfig;
use crate::history::{self, ExchangeStore};

/// Plays back the spoken answer of a previous exchange.
///
/// # Arguments
/// * `index` - Optional exchange index (1 = most recent, None = most recent)
pub async fn handle_replay(index: Option<usize>) -> Result<(), anyhow::Error> {
    tracing::info!("=== ova Replay Command ===");

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

    let audio_path = exchange.answer_audio.ok_or_else(|| {
        anyhow::anyhow!(
            "The answer audio of exchange #{index} is no longer retained. \
             Only the most recent exchanges keep their audio files."
        )
    })?;

    if !audio_path.exists() {
        return Err(anyhow::anyhow!(
            "Audio file not found: {}",
            audio_path.display()
        ));
    }

    tracing::info!(
        "Playing answer of exchange #{} from {}",
        index,
        exchange.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    // A missing or broken config falls back to probing for a player
    let pinned = OvaConfig::load()
        .ok()
        .and_then(|config| config.server.player);

    crate::playback::play_wav(&audio_path, pinned.as_deref())?;

    tracing::info!("Playback finished for exchange #{index}");
    Ok(())
}
