use crate::common::GlobalOpts;
use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use scriptbridge_config::Config;
use scriptbridge_logger as logger;
use std::fs;
use std::path::Path;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Set a configuration key (default-language, bridge-binding)
    Set { key: String, value: String },
    /// Get or set the path to the config file.
    /// If `new_path` is provided, later runs read the config from there.
    /// If omitted, the current configuration file path is printed.
    Path {
        /// Optional new config path to set
        new_path: Option<String>,
    },
}

pub fn handle_config(action: Option<ConfigAction>, opts: &GlobalOpts) -> Result<()> {
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = Config::load().context("Failed to load config")?;
            println!("{}", "Configuration:".bold().green());
            if config.is_empty() {
                if opts.verbosity_level() > 0 {
                    println!("  {}", "(empty)".yellow());
                }
            } else {
                for (key, value) in config.values_iter() {
                    println!("  {}: {}", key.cyan(), value);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let path = Config::path();
            set_value(&path, &key, &value)?;
            logger::success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Path { new_path } => {
            let config_path = Config::path();
            logger::debug(&format!("Reading config from: {}", config_path.display()));
            match new_path {
                Some(p) => {
                    write_pointer(&Config::pointer_path(), &p)?;
                    logger::success(&format!("Config path set to {}", p));
                }
                None => println!("{}", config_path.display()),
            }
        }
    }
    Ok(())
}

/// Update `key` in the config file at `path`, creating the file if needed.
pub fn set_value(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut config = Config::load_from(path).context("Failed to load config")?;
    config.set(key, value.to_string())?;
    config.save_to(path).context("Failed to save config")?;
    Ok(())
}

fn write_pointer(pointer_path: &Path, target: &str) -> Result<()> {
    if let Some(parent) = pointer_path.parent() {
        fs::create_dir_all(parent).context("Failed to set config path")?;
    }
    fs::write(pointer_path, target.as_bytes()).context("Failed to set config path")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_value_creates_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("scriptbridge.toml");
        set_value(&path, "default-language", "python")?;
        set_value(&path, "bridge-binding", "host")?;

        let config = Config::load_from(&path)?;
        assert_eq!(config.default_language(), "python");
        assert_eq!(config.bridge_binding(), "host");
        Ok(())
    }

    #[test]
    fn test_set_unknown_key_fails() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("scriptbridge.toml");
        assert!(set_value(&path, "colour", "blue").is_err());
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_write_pointer() -> Result<()> {
        let dir = TempDir::new()?;
        let pointer = dir.path().join("config").join(".pointer");
        write_pointer(&pointer, "/tmp/elsewhere.toml")?;
        assert_eq!(fs::read_to_string(&pointer)?, "/tmp/elsewhere.toml");
        Ok(())
    }
}
