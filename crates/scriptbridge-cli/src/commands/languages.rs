use crate::common::GlobalOpts;
use crate::session;
use anyhow::{Context, Result};
use colored::Colorize;
use scriptbridge_config::Config;
use scriptbridge_core::Manager;
use scriptbridge_logger as logger;

/// One row of the `languages` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRow {
    pub id: String,
    pub extensions: Vec<String>,
    pub is_default: bool,
    pub loaded: bool,
}

pub fn language_rows(manager: &Manager, config: &Config) -> Vec<LanguageRow> {
    let loaded = manager.loaded_languages();
    manager
        .languages()
        .into_iter()
        .map(|spec| {
            let mut extensions = spec.extensions;
            extensions.sort();
            LanguageRow {
                is_default: spec.id == config.default_language(),
                loaded: loaded.contains(&spec.id),
                id: spec.id,
                extensions,
            }
        })
        .collect()
}

pub fn handle_languages(_opts: &GlobalOpts) -> Result<()> {
    let config = Config::load().context("Failed to load config")?;
    let manager = session::open(&config);
    let rows = language_rows(&manager, &config);

    if rows.is_empty() {
        logger::warn("No languages registered (check `enabled` in the config)");
        return Ok(());
    }
    println!("{}", "Languages:".bold().green());
    for row in rows {
        let extensions = row
            .extensions
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect::<Vec<_>>()
            .join(", ");
        let marker = if row.is_default { " (default)" } else { "" };
        println!("  {}{}: {}", row.id.cyan(), marker.dimmed(), extensions);
    }
    Ok(())
}
