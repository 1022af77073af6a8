use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ThreadError};

/// Model settings handed to the completion service with every prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreadConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Expansion value for tree nodes that were never toggled.
    #[serde(default = "default_expanded")]
    pub default_expanded: bool,
    /// Upper bound on ancestors walked when assembling context messages.
    #[serde(default = "default_max_context_depth")]
    pub max_context_depth: usize,
}

const CONFIG_FILE_PATH: &str = "threads.toml";

fn default_event_capacity() -> usize {
    64
}

fn default_expanded() -> bool {
    true
}

fn default_max_context_depth() -> usize {
    32
}

fn threads_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".shard-threads")
}

fn threads_config_json_path() -> PathBuf {
    threads_dir().join("config.json")
}

fn parse_bool_env(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            storage_dir: None,
            event_capacity: default_event_capacity(),
            default_expanded: default_expanded(),
            max_context_depth: default_max_context_depth(),
        }
    }
}

impl ThreadConfig {
    /// Load from `~/.shard-threads/config.json`, else `./threads.toml`, then
    /// apply environment overrides. Unreadable files fall back to defaults.
    pub fn load() -> Self {
        let mut config = ThreadConfig::default();

        let mut loaded = false;
        let json_path = threads_config_json_path();
        if json_path.exists() {
            match Self::from_json_file(&json_path) {
                Ok(file_config) => {
                    config = file_config;
                    loaded = true;
                }
                Err(e) => tracing::warn!(path = %json_path.display(), "Ignoring config: {}", e),
            }
        }

        if !loaded && Path::new(CONFIG_FILE_PATH).exists() {
            match Self::from_toml_file(CONFIG_FILE_PATH) {
                Ok(file_config) => config = file_config,
                Err(e) => tracing::warn!(path = CONFIG_FILE_PATH, "Ignoring config: {}", e),
            }
        }

        config.apply_env();
        config
    }

    /// Directory of the file backend: `storage_dir`, else `~/.shard-threads/points`.
    pub fn points_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| threads_dir().join("points"))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ThreadError::Config(e.to_string()))
    }

    fn apply_env(&mut self) {
        if let Ok(model) = std::env::var("THREADS_MODEL") {
            self.model.model = model;
        }
        if let Ok(temperature) = std::env::var("THREADS_TEMPERATURE") {
            match temperature.trim().parse::<f32>() {
                Ok(value) => self.model.temperature = Some(value),
                Err(_) => tracing::warn!(value = %temperature, "Ignoring THREADS_TEMPERATURE"),
            }
        }
        if let Ok(dir) = std::env::var("THREADS_STORAGE_DIR") {
            self.storage_dir = Some(PathBuf::from(dir));
        }
        if let Ok(expanded) = std::env::var("THREADS_DEFAULT_EXPANDED") {
            self.default_expanded = parse_bool_env(&expanded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_bool_env_true_values() {
        for value in ["1", "true", "TRUE", " yes ", "Y", "on"] {
            assert!(parse_bool_env(value), "value {value:?} should be true");
        }
    }

    #[test]
    fn parse_bool_env_false_values() {
        for value in ["0", "false", "no", "off", "", "  "] {
            assert!(!parse_bool_env(value), "value {value:?} should be false");
        }
    }

    #[test]
    fn toml_file_fills_missing_fields_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("threads.toml");
        std::fs::write(
            &path,
            "default_expanded = false\n\n[model]\nmodel = \"claude\"\ntemperature = 0.2\n",
        )
        .unwrap();

        let config = ThreadConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.model.model, "claude");
        assert_eq!(config.model.temperature, Some(0.2));
        assert!(!config.default_expanded);
        assert_eq!(config.event_capacity, 64);
        assert_eq!(config.max_context_depth, 32);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("threads.toml");
        std::fs::write(&path, "model = [").unwrap();

        let err = ThreadConfig::from_toml_file(&path).unwrap_err();
        assert!(matches!(err, ThreadError::Config(_)));
    }

    #[test]
    fn json_file_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = ThreadConfig::default();
        config.storage_dir = Some(dir.path().join("points"));
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        assert_eq!(ThreadConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn points_dir_prefers_storage_dir() {
        let mut config = ThreadConfig::default();
        assert!(config.points_dir().ends_with(".shard-threads/points"));

        config.storage_dir = Some(PathBuf::from("/tmp/threads"));
        assert_eq!(config.points_dir(), PathBuf::from("/tmp/threads"));
    }
}
