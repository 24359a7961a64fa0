use std::path::{Path, PathBuf};

use anyhow::Result;
use clubcal_core::config::EngineConfig;
use owo_colors::OwoColorize;

use crate::commands::SourceArgs;

fn resolve_path(source: &SourceArgs) -> Result<PathBuf> {
    match &source.config {
        Some(path) => Ok(path.clone()),
        None => Ok(EngineConfig::config_path()?),
    }
}

/// Write a commented default config file.
pub fn init(source: &SourceArgs, force: bool) -> Result<()> {
    let path = resolve_path(source)?;
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}\n\
            Use --force to overwrite it",
            path.display()
        );
    }
    EngineConfig::create_default_config(&path)?;
    println!("Created {}", path.display());
    Ok(())
}

/// Print the effective configuration after file and environment layering.
pub fn show(source: &SourceArgs) -> Result<()> {
    let path = resolve_path(source)?;
    let settings = source.settings()?;

    println!("{}", "Paths".bold());
    println!("  Config:  {}{}", path.display(), missing_marker(&path));
    println!();
    println!("{}", "Feed".bold());
    match settings.feed(source.feed.as_deref()) {
        Ok(location) => println!("  Source:  {location}"),
        Err(_) => println!("  {}", "not configured".dimmed()),
    }
    let viewer = settings.viewer(source.level.as_deref(), source.anonymous);
    println!(
        "  Viewer:  {}",
        viewer.membership_level().unwrap_or("anonymous")
    );
    println!();
    println!("{}", "Engine".bold());
    print!("{}", settings.engine.to_toml()?);
    Ok(())
}

fn missing_marker(path: &Path) -> String {
    if path.exists() {
        String::new()
    } else {
        format!(" {}", "(not created, using defaults)".dimmed())
    }
}
