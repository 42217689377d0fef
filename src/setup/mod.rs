//! Setup module for initial application configuration.
//!
//! Handles first-run setup by writing the default config file, and re-runs
//! when the binary version moves ahead of the config version.

pub mod version;

use anyhow::anyhow;

/// Embedded default configuration template.
const DEFAULT_CONFIG: &str = include_str!("../../environments/ova.toml");

/// Current application version from Cargo.toml
const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs the setup process.
///
/// Creates the config directory and writes the default config file with a
/// `config_version` line prepended. Overwrites any existing config.
///
/// # Errors
/// Returns an error if any file operations fail.
pub fn run_setup() -> anyhow::Result<()> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("ova");
    std::fs::create_dir_all(&config_dir)?;

    // Write main config file with version prefix
    let config_path = config_dir.join("ova.toml");
    let version_line = format!(r#"config_version = "{}""#, CURRENT_VERSION);
    let full_config = format!("{}\n{}", version_line, DEFAULT_CONFIG);
    std::fs::write(&config_path, full_config)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OvaConfig;

    #[test]
    fn test_default_config_template_parses() {
        let config: OvaConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.audio.device, "default");
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.server.url, "http://127.0.0.1:8000");
        assert!(config.server.playback);
    }

    #[test]
    fn test_template_with_version_line_still_parses() {
        let full = format!("config_version = \"{}\"\n{}", CURRENT_VERSION, DEFAULT_CONFIG);
        // OvaConfig ignores the version line, which setup::version owns
        let config: OvaConfig = toml::from_str(&full).unwrap();
        assert_eq!(config.audio.device, "default");
    }
}
