//! Exchange history: persistence and interactive browsing.

pub mod storage;
pub mod ui;

pub use storage::{Exchange, ExchangeStore};
pub use ui::ExchangeViewer;

use anyhow::Result;
use std::path::PathBuf;

/// Data directory for the exchange database and retained audio files,
/// following the XDG Base Directory Specification.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn data_dir() -> Result<PathBuf> {
    let dir = if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join("ova")
    } else {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        home.join(".local/share/ova")
    };

    Ok(dir)
}
