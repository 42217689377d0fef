//! Version comparison and migration logic.
//!
//! Setup is re-run whenever the version recorded in the config file falls
//! behind the binary version. The version lives on the first line of the
//! config file as `config_version = "X.Y.Z"`.

use anyhow::anyhow;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

/// Current application version from Cargo.toml
const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Represents a semantic version (major.minor.patch)
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
struct SemanticVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

impl SemanticVersion {
    /// Parse a version string like "0.1.0" into a SemanticVersion
    fn parse(version_str: &str) -> anyhow::Result<Self> {
        let component = |part: &str, name: &str| {
            part.parse::<u32>()
                .map_err(|_| anyhow!("Invalid {} version: '{}'", name, part))
        };

        let parts: Vec<&str> = version_str.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(anyhow!(
                "Invalid version format: '{}'. Expected 'major.minor.patch'",
                version_str
            ));
        }

        Ok(SemanticVersion {
            major: component(parts[0], "major")?,
            minor: component(parts[1], "minor")?,
            patch: component(parts[2], "patch")?,
        })
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Reads the config version from the first line of the config file.
///
/// The first line must match `config_version = "X.Y.Z"` with optional
/// leading whitespace. Comment lines do not count.
///
/// # Errors
/// Returns an error if the file can't be read.
fn read_config_version(config_path: &Path) -> anyhow::Result<Option<String>> {
    if !config_path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(config_path)?;
    let first_line = match content.lines().next() {
        Some(line) => line,
        None => return Ok(None),
    };

    let regex = Regex::new(r#"^\s*config_version\s*=\s*"([^"]+)""#)?;
    if let Some(caps) = regex.captures(first_line) {
        return Ok(Some(caps[1].to_string()));
    }

    Ok(None)
}

/// Determines if setup is needed by checking version and config file existence.
///
/// Setup is needed if:
/// 1. Config file doesn't exist, OR
/// 2. Config file exists but has no version (legacy config), OR
/// 3. Config file version is older than the binary version
///
/// Returns the version the config file was at, or None when no setup is
/// needed. A missing config file returns None as well; callers treat that
/// case separately.
pub fn check_setup_needed(config_path: &Path) -> anyhow::Result<Option<String>> {
    if !config_path.exists() {
        return Ok(None);
    }

    let config_version = match read_config_version(config_path)? {
        Some(version) => version,
        // Config exists but carries no version line (legacy config)
        None => return Ok(Some("unknown (legacy config)".to_string())),
    };

    let config_parsed = SemanticVersion::parse(&config_version)?;
    let current_parsed = SemanticVersion::parse(CURRENT_VERSION)?;

    match config_parsed.cmp(&current_parsed) {
        Ordering::Less => Ok(Some(config_version)),
        Ordering::Equal => Ok(None),
        Ordering::Greater => {
            // Config is newer than binary (downgraded install). Warn but
            // don't block startup.
            tracing::warn!(
                "Config version {} is newer than app version {}",
                config_version,
                CURRENT_VERSION
            );
            Ok(None)
        }
    }
}

/// Adds or updates the config_version line as the first line of the config file.
///
/// Preserves all other content: reads the full file, strips any existing
/// config_version line, and prepends the new version line.
pub fn update_config_version(config_path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(config_path)?;

    let lines: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim_start().starts_with("config_version"))
        .collect();

    let version_line = format!(r#"config_version = "{}""#, CURRENT_VERSION);
    let new_content = if lines.is_empty() {
        version_line
    } else {
        format!("{}\n{}", version_line, lines.join("\n"))
    };

    std::fs::write(config_path, new_content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_semantic_version_parse() {
        let v = SemanticVersion::parse("0.1.0").unwrap();
        assert_eq!(v.major, 0);
        assert_eq!(v.minor, 1);
        assert_eq!(v.patch, 0);
    }

    #[test]
    fn test_semantic_version_comparison() {
        let v1 = SemanticVersion::parse("0.0.9").unwrap();
        let v2 = SemanticVersion::parse("0.1.0").unwrap();
        let v3 = SemanticVersion::parse("1.0.0").unwrap();

        assert!(v1 < v2);
        assert!(v2 < v3);
        assert_eq!(v1, v1.clone());
    }

    #[test]
    fn test_invalid_version_format() {
        assert!(SemanticVersion::parse("0.1").is_err());
        assert!(SemanticVersion::parse("0.1.0.1").is_err());
        assert!(SemanticVersion::parse("invalid").is_err());
    }

    #[test]
    fn test_missing_config_needs_no_version_migration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ova.toml");
        assert_eq!(check_setup_needed(&path).unwrap(), None);
    }

    #[test]
    fn test_legacy_config_without_version_triggers_setup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ova.toml");
        fs::write(&path, "[audio]\ndevice = \"default\"\n").unwrap();

        let needed = check_setup_needed(&path).unwrap();
        assert_eq!(needed.as_deref(), Some("unknown (legacy config)"));
    }

    #[test]
    fn test_older_config_version_triggers_setup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ova.toml");
        fs::write(&path, "config_version = \"0.0.1\"\n[audio]\n").unwrap();

        let needed = check_setup_needed(&path).unwrap();
        assert_eq!(needed.as_deref(), Some("0.0.1"));
    }

    #[test]
    fn test_current_config_version_needs_no_setup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ova.toml");
        fs::write(
            &path,
            format!("config_version = \"{}\"\n[audio]\n", CURRENT_VERSION),
        )
        .unwrap();

        assert_eq!(check_setup_needed(&path).unwrap(), None);
    }

    #[test]
    fn test_update_config_version_replaces_old_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ova.toml");
        fs::write(&path, "config_version = \"0.0.1\"\n[audio]\ndevice = \"default\"\n").unwrap();

        update_config_version(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some(format!("config_version = \"{}\"", CURRENT_VERSION).as_str())
        );
        assert!(content.contains("device = \"default\""));
        assert_eq!(content.matches("config_version").count(), 1);
    }
}
