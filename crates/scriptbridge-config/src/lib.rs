//! Configuration for scriptbridge
//!
//! The configuration lives in a TOML file, by default
//! `~/.config/scriptbridge/scriptbridge.toml`:
//!
//! ```toml
//! default-language = "python"
//! bridge-binding = "bsf"
//!
//! [languages.python]
//! extensions = ["py", "jy"]
//! enabled = true
//! ```
//!
//! `SCRIPTBRIDGE_CONFIG` overrides the location, which keeps tests isolated
//! from the user's real configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "SCRIPTBRIDGE_CONFIG";

const CONFIG_DIR: &str = "scriptbridge";
const CONFIG_FILE: &str = "scriptbridge.toml";
const POINTER_FILE: &str = ".scriptbridge_config_path";
const DEFAULT_BRIDGE_BINDING: &str = "bsf";
const DEFAULT_LANGUAGE: &str = "python";

/// Keys accepted by [`Config::get`] and [`Config::set`]
pub const KNOWN_KEYS: &[&str] = &["default-language", "bridge-binding"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key: {0}. Supported keys: default-language, bridge-binding")]
    UnknownKey(String),
}

/// Per-language settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    /// Additional file extensions mapped to the language
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            enabled: true,
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_binding: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub languages: BTreeMap<String, LanguageConfig>,
}

impl Config {
    /// Resolve the config file path.
    ///
    /// Order: `SCRIPTBRIDGE_CONFIG`, then a pointer file next to the default
    /// location, then the default location itself.
    pub fn path() -> PathBuf {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }

        let default = config_dir().join(CONFIG_FILE);
        let pointer = config_dir().join(POINTER_FILE);
        if let Ok(contents) = fs::read_to_string(&pointer) {
            let trimmed = contents.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }

        default
    }

    /// Path of the pointer file used by `config path <new>`
    pub fn pointer_path() -> PathBuf {
        config_dir().join(POINTER_FILE)
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path())
    }

    /// Load from `path`, returning the defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            Ok(Config::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "default-language" => self.default_language.clone(),
            "bridge-binding" => self.bridge_binding.clone(),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<(), ConfigError> {
        match key {
            "default-language" => self.default_language = Some(value),
            "bridge-binding" => self.bridge_binding = Some(value),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.default_language.is_none() && self.bridge_binding.is_none() && self.languages.is_empty()
    }

    /// Flattened `(key, value)` pairs for display.
    pub fn values_iter(&self) -> Vec<(String, String)> {
        let mut values = Vec::new();
        if let Some(ref val) = self.default_language {
            values.push(("default-language".to_string(), val.clone()));
        }
        if let Some(ref val) = self.bridge_binding {
            values.push(("bridge-binding".to_string(), val.clone()));
        }
        for (id, lang) in &self.languages {
            if !lang.extensions.is_empty() {
                values.push((format!("languages.{}.extensions", id), lang.extensions.join(", ")));
            }
            if !lang.enabled {
                values.push((format!("languages.{}.enabled", id), "false".to_string()));
            }
        }
        values
    }

    pub fn default_language(&self) -> &str {
        self.default_language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn bridge_binding(&self) -> &str {
        self.bridge_binding
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(DEFAULT_BRIDGE_BINDING)
    }

    pub fn is_language_enabled(&self, id: &str) -> bool {
        self.languages.get(id).map_or(true, |lang| lang.enabled)
    }
}

/// Platform config directory for scriptbridge
fn config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    let base = dirs::home_dir().map(|home| home.join(".config"));

    #[cfg(target_os = "windows")]
    let base = dirs::config_dir();

    base.unwrap_or_else(|| PathBuf::from(".")).join(CONFIG_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.is_empty());
        assert_eq!(config.default_language(), "python");
        assert_eq!(config.bridge_binding(), "bsf");
        assert!(config.is_language_enabled("python"));
    }

    #[test]
    fn test_parse_languages() -> Result<(), ConfigError> {
        let config = Config::from_toml_str(
            r#"
default-language = "echo"
bridge-binding = "host"

[languages.python]
extensions = ["jy"]

[languages.echo]
enabled = false
"#,
        )?;
        assert_eq!(config.default_language(), "echo");
        assert_eq!(config.bridge_binding(), "host");
        assert_eq!(config.languages["python"].extensions, vec!["jy".to_string()]);
        assert!(config.is_language_enabled("python"));
        assert!(!config.is_language_enabled("echo"));
        Ok(())
    }

    #[test]
    fn test_blank_binding_falls_back() -> Result<(), ConfigError> {
        let config = Config::from_toml_str("bridge-binding = \"  \"")?;
        assert_eq!(config.bridge_binding(), "bsf");
        Ok(())
    }

    #[test]
    fn test_set_and_get() -> Result<(), ConfigError> {
        let mut config = Config::default();
        config.set("default-language", "python".to_string())?;
        assert_eq!(config.get("default-language").as_deref(), Some("python"));
        assert!(matches!(
            config.set("venv-path", "x".to_string()),
            Err(ConfigError::UnknownKey(_))
        ));
        Ok(())
    }

    #[test]
    fn test_save_and_load_roundtrip() -> Result<(), ConfigError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("scriptbridge.toml");

        let mut config = Config::default();
        config.set("bridge-binding", "bridge".to_string())?;
        config.languages.insert(
            "python".to_string(),
            LanguageConfig {
                extensions: vec!["jy".to_string()],
                enabled: true,
            },
        );
        config.save_to(&path)?;

        let loaded = Config::load_from(&path)?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_missing_file_loads_defaults() -> Result<(), ConfigError> {
        let dir = TempDir::new()?;
        let loaded = Config::load_from(&dir.path().join("absent.toml"))?;
        assert!(loaded.is_empty());
        Ok(())
    }

    #[test]
    fn test_values_iter() {
        let mut config = Config::default();
        config.default_language = Some("python".to_string());
        config.languages.insert(
            "echo".to_string(),
            LanguageConfig {
                extensions: Vec::new(),
                enabled: false,
            },
        );
        let values = config.values_iter();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1].0, "languages.echo.enabled");
    }
}
