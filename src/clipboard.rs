//! Clipboard utilities for ova.
//!
//! Handles copying answer text to the system clipboard using pbcopy (macOS),
//! wl-copy (Wayland) or xclip (X11).

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

/// Clipboard tools to try, in order. The first one that spawns and accepts
/// the text on stdin wins.
#[cfg(target_os = "macos")]
const CLIPBOARD_TOOLS: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("wl-copy", &["--type", "text/plain", "--trim-newline"]),
    ("xclip", &["-selection", "clipboard", "-in", "-quiet"]),
];

#[cfg(not(target_os = "macos"))]
const CLIPBOARD_TOOLS: &[(&str, &[&str])] = &[
    ("wl-copy", &["--type", "text/plain", "--trim-newline"]),
    ("xclip", &["-selection", "clipboard", "-in", "-quiet"]),
];

/// Copies text to the system clipboard.
///
/// Tries pbcopy first on macOS, then wl-copy for Wayland environments, then
/// falls back to xclip for X11. Does not fail if no clipboard is available,
/// so the surrounding command still succeeds.
pub fn copy_to_clipboard(text: &str) -> anyhow::Result<()> {
    for (tool, args) in CLIPBOARD_TOOLS {
        match pipe_to(tool, args, text) {
            Ok(()) => {
                tracing::debug!("Text copied to clipboard via {tool}");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!("Clipboard tool {tool} unavailable: {e}");
            }
        }
    }

    tracing::warn!("No clipboard tool available");
    Ok(())
}

/// Spawns a command and writes the text to its stdin.
fn pipe_to(tool: &str, args: &[&str], text: &str) -> anyhow::Result<()> {
    let mut child = Command::new(tool).args(args).stdin(Stdio::piped()).spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        write!(stdin, "{text}")?;
        drop(stdin);
        // Give the tool a moment to grab the selection before we exit
        thread::sleep(Duration::from_millis(100));
    }

    Ok(())
}
