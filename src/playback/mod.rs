//! Spoken answer playback through a system audio player.
//!
//! No audio output stack is linked in; playback shells out to whatever
//! command line player the machine has. Candidates are probed in order and
//! the first one that spawns and exits cleanly wins. A player pinned in the
//! config skips the probing.

use anyhow::{anyhow, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// Known players and the flags that keep them quiet and window-free.
const PLAYER_ARGS: &[(&str, &[&str])] = &[
    ("afplay", &[]),
    ("paplay", &[]),
    ("aplay", &["-q"]),
    ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "error"]),
    ("mpv", &["--no-video", "--really-quiet"]),
];

/// Probe order per platform.
#[cfg(target_os = "macos")]
const PLAYER_ORDER: &[&str] = &["afplay", "mpv", "ffplay"];

#[cfg(not(target_os = "macos"))]
const PLAYER_ORDER: &[&str] = &["paplay", "aplay", "ffplay", "mpv"];

/// Plays a WAV file and blocks until playback finishes.
///
/// With a pinned player, only that binary is tried and its failure is
/// reported as-is. Otherwise the platform candidates are probed in order;
/// a candidate that is missing or exits non-zero is skipped.
///
/// # Errors
/// - If the pinned player fails
/// - If no candidate player works
pub fn play_wav(path: &Path, pinned: Option<&str>) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("Audio file not found: {}", path.display()));
    }

    if let Some(player) = pinned {
        return run_player(player, args_for(player), path);
    }

    for player in PLAYER_ORDER {
        match run_player(player, args_for(player), path) {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::debug!("Player {player} unavailable: {e}");
            }
        }
    }

    Err(anyhow!(
        "No audio player found. Install one of: {}",
        PLAYER_ORDER.join(", ")
    ))
}

/// Spawns a player process and waits for it to exit.
///
/// Stdout and stderr are discarded so players cannot scribble over the TUI.
fn run_player(player: &str, args: &[&str], path: &Path) -> Result<()> {
    let status = Command::new(player)
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| anyhow!("Failed to start {player}: {e}"))?;

    if !status.success() {
        return Err(anyhow!("{player} exited with {status}"));
    }

    tracing::debug!("Played {} via {player}", path.display());
    Ok(())
}

/// Flags for a known player, empty for anything else.
fn args_for(player: &str) -> &'static [&'static str] {
    PLAYER_ARGS
        .iter()
        .find(|(name, _)| *name == player)
        .map(|(_, args)| *args)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_players_have_flags() {
        assert_eq!(args_for("aplay"), &["-q"]);
        assert_eq!(
            args_for("ffplay"),
            &["-nodisp", "-autoexit", "-loglevel", "error"]
        );
        assert!(args_for("afplay").is_empty());
    }

    #[test]
    fn test_unknown_player_gets_no_flags() {
        assert!(args_for("some-custom-player").is_empty());
    }

    #[test]
    fn test_probe_order_players_are_known() {
        for player in PLAYER_ORDER {
            assert!(
                PLAYER_ARGS.iter().any(|(name, _)| name == player),
                "{player} missing from PLAYER_ARGS"
            );
        }
    }

    #[test]
    fn test_missing_file_is_rejected_before_probing() {
        let result = play_wav(Path::new("/nonexistent/answer.wav"), None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }
}
