//! Configuration file management for ova.
//!
//! This module handles loading and saving application configuration from TOML files.
//! Configuration is stored in the user's config directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Audio recording configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `ova list-devices`
    /// - device name from `ova list-devices`
    pub device: String,
    /// Recording sample rate in Hz (16000 recommended for speech recognition)
    pub sample_rate: u32,
    /// Peak volume threshold for visual indicator (0-100, percentage of reference level)
    #[serde(default = "default_peak_volume_threshold")]
    pub peak_volume_threshold: u8,
    /// Reference level in dBFS for 100% meter display (typical: -20 to -6 dBFS)
    #[serde(default = "default_reference_level_db")]
    pub reference_level_db: i8,
}

fn default_peak_volume_threshold() -> u8 {
    90
}

fn default_reference_level_db() -> i8 {
    -20
}

/// Assistant server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the assistant server. Questions are posted to
    /// `<url>/process_audio/`.
    #[serde(default = "default_server_url")]
    pub url: String,
    /// Play the spoken answer through a system audio player when a
    /// response arrives
    #[serde(default = "default_true")]
    pub playback: bool,
    /// Pin a specific audio player binary instead of probing for one
    #[serde(default)]
    pub player: Option<String>,
}

fn default_server_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            playback: true,
            player: None,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OvaConfig {
    pub audio: AudioConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl OvaConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        let config_path = config_path()?;
        let config_content = fs::read_to_string(&config_path)?;
        let config: OvaConfig = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be written
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }

    /// Returns default configuration values.
    #[allow(dead_code)]
    pub(crate) fn default() -> Self {
        OvaConfig {
            audio: AudioConfig {
                device: "default".to_string(),
                sample_rate: 16000,
                peak_volume_threshold: default_peak_volume_threshold(),
                reference_level_db: default_reference_level_db(),
            },
            server: ServerConfig::default(),
        }
    }
}

/// Retrieves the path to the config file, creating the parent directory
/// if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn config_path() -> Result<PathBuf, std::io::Error> {
    let home = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not find home directory",
        )
    })?;
    let config_path = home.join(".config").join("ova").join("ova.toml");

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config: OvaConfig = toml::from_str(
            r#"
            [audio]
            device = "default"
            sample_rate = 16000
            "#,
        )
        .unwrap();

        assert_eq!(config.audio.peak_volume_threshold, 90);
        assert_eq!(config.audio.reference_level_db, -20);
        assert_eq!(config.server.url, "http://127.0.0.1:8000");
        assert!(config.server.playback);
        assert!(config.server.player.is_none());
    }

    #[test]
    fn test_server_section_overrides() {
        let config: OvaConfig = toml::from_str(
            r#"
            [audio]
            device = "1"
            sample_rate = 44100

            [server]
            url = "http://assistant.local:9000"
            playback = false
            player = "mpv"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.url, "http://assistant.local:9000");
        assert!(!config.server.playback);
        assert_eq!(config.server.player.as_deref(), Some("mpv"));
    }
}
