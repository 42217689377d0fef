//! Application command handlers for ova.
//!
//! This module organizes command handling into separate submodules, each responsible for a specific
//! application command (asking, history viewing, playback).
//!
//! # Commands
//! - `ask`: Interactive record/upload/answer flow (default command)
//! - `send`: Submit a pre-recorded audio file as a question
//! - `resend`: Re-submit a previous question from history
//! - `replay`: Play back a previous answer from history
//! - `history`: Exchange history viewer
//! - `config`: Open configuration file in user's preferred editor
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries

pub mod ask;
pub mod config;
pub mod history;
pub mod list_devices;
pub mod logs;
pub mod replay;
pub mod resend;
pub mod send;

pub use ask::handle_ask;
pub use config::handle_config;
pub use history::handle_history;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use replay::handle_replay;
pub use resend::handle_resend;
pub use send::handle_send;

use crate::clipboard::copy_to_clipboard;

/// Routes an answer to its output destination: file > clipboard > stdout.
pub(crate) fn route_answer(
    answer: &str,
    clipboard: bool,
    output_file: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(file_path) = output_file {
        std::fs::write(file_path, answer)
            .map_err(|e| anyhow::anyhow!("Failed to write to file '{file_path}': {e}"))?;
        tracing::debug!("Answer written to file: {file_path}");
    } else if clipboard {
        if let Err(e) = copy_to_clipboard(answer) {
            tracing::warn!("Failed to copy to clipboard: {e}");
        } else {
            tracing::debug!("Answer copied to clipboard");
        }
    } else {
        println!("{answer}");
        tracing::debug!("Answer printed to stdout");
    }
    Ok(())
}
