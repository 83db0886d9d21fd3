//! Config I/O operations: load and save.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::config_struct::Config;

// ============================================================================
// CONFIG PATH
// ============================================================================

/// Get the config file path
pub fn get_config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_default()
        .join("speaking-buddy");
    let _ = std::fs::create_dir_all(&config_dir);
    config_dir.join("config.json")
}

// ============================================================================
// CONFIG LOADING
// ============================================================================

/// Load config from disk, falling back to defaults on any problem
pub fn load_config_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Config::default();
    }

    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read config");
            return Config::default();
        }
    };

    match serde_json::from_str::<Config>(&data) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Corrupt config, using defaults");
            Config::default()
        }
    }
}

// ============================================================================
// CONFIG SAVING
// ============================================================================

/// Save config to disk as pretty JSON
pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(config)?;
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Config saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::ProficiencyLevel;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("nope.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_config_from(&path), Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"gemini_api_key":"k","level":"A2"}"#).unwrap();
        let config = load_config_from(&path);
        assert_eq!(config.gemini_api_key, "k");
        assert_eq!(config.level, ProficiencyLevel::A2);
        assert_eq!(config.child_name, "Anna");
        assert_eq!(config.request_timeout_secs, 120);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            gemini_api_key: "secret".to_string(),
            child_name: "Minh".to_string(),
            level: ProficiencyLevel::B1,
            ..Config::default()
        };
        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path), config);
    }
}
