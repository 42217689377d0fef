//! Exchange history viewer.
//!
//! Displays past question/answer exchanges with answer playback and
//! copy-to-clipboard functionality.

use crate::clipboard::copy_to_clipboard;
use crate::config::OvaConfig;
use crate::history::{self, ExchangeStore, ExchangeViewer};

/// Displays the exchange history viewer.
///
/// # Errors
/// - If the data directory cannot be determined
/// - If the exchange store fails to load
pub async fn handle_history() -> Result<(), anyhow::Error> {
    tracing::info!("=== ova History Viewer ===");

    let data_dir = history::data_dir()?;
    let mut store = ExchangeStore::new(&data_dir)?;
    let entries = store.get_all_exchanges()?;

    if entries.is_empty() {
        println!("No exchange history found.");
        return Ok(());
    }

    let pinned = OvaConfig::load()
        .ok()
        .and_then(|config| config.server.player);

    let mut viewer = ExchangeViewer::new(entries, pinned)?;

    match viewer.run()? {
        Some(selected_text) => {
            copy_to_clipboard(&selected_text)?;
            tracing::info!("Selected answer copied to clipboard");
        }
        None => {
            tracing::debug!("History viewer exited without selection");
        }
    }

    tracing::debug!("History viewer closed");
    Ok(())
}
