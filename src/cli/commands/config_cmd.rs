//! config command - Print the effective or default configuration

use anyhow::{Context as _, Result};

use super::{load_project, Project};
use crate::core::config::{Config, DumpFormat};
use crate::engine::Context;

/// Print the configuration as TOML, or JSON with `json`.
///
/// With `default`, prints the built-in defaults and needs no bakerfile.
pub fn config(ctx: &Context, default: bool, json: bool) -> Result<()> {
    let format = if json {
        DumpFormat::Json
    } else {
        DumpFormat::Toml
    };

    let shown = if default {
        Config::defaults()
    } else {
        let Project { config, .. } = load_project(ctx)?;
        config.effective()
    };

    let text = Config::dump(&shown, format).context("Failed to serialize configuration")?;
    // Not affected by --quiet.
    print!("{text}");
    if !text.ends_with('\n') {
        println!();
    }
    Ok(())
}
