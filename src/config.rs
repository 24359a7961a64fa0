//! CLI settings: where events come from and who is looking.
//!
//! Shares one file and one environment prefix with the engine config, so a
//! single `config.toml` configures both.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clubcal_core::config::{EngineConfig, layered};
use clubcal_core::visibility::ViewerContext;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// JSON feed endpoint
    pub feed_url: Option<String>,
    /// Static JSON feed on disk, used when no URL is set
    pub feed_file: Option<PathBuf>,
    /// Membership level of the viewer; unset means anonymous
    pub membership_level: Option<String>,
    #[serde(flatten)]
    pub engine: EngineConfig,
}

/// Where the feed comes from, after command-line overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLocation {
    Url(String),
    File(PathBuf),
}

impl fmt::Display for FeedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedLocation::Url(url) => f.write_str(url),
            FeedLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Settings {
    /// Load from `path` (or the default config path) and `CLUBCAL_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let default_path;
        let path = match path {
            Some(p) => p,
            None => {
                default_path = EngineConfig::config_path()?;
                &default_path
            }
        };
        let settings = layered(Some(path))?
            .try_deserialize()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(settings)
    }

    /// `--feed` wins over the config file. Anything with a scheme is a URL.
    pub fn feed(&self, flag: Option<&str>) -> Result<FeedLocation> {
        if let Some(raw) = flag {
            return Ok(match url::Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => FeedLocation::Url(raw.to_string()),
                _ => FeedLocation::File(PathBuf::from(raw)),
            });
        }
        if let Some(url) = &self.feed_url {
            return Ok(FeedLocation::Url(url.clone()));
        }
        if let Some(file) = &self.feed_file {
            return Ok(FeedLocation::File(file.clone()));
        }
        anyhow::bail!(
            "No event feed configured.\n\n\
            Pass one with:\n  \
            clubcal --feed <url-or-file> events\n\n\
            or set feed_url in the config file (see `clubcal config init`)"
        )
    }

    /// `--as` wins over the config file; `--anonymous` wins over both.
    pub fn viewer(&self, level: Option<&str>, anonymous: bool) -> ViewerContext {
        if anonymous {
            return ViewerContext::anonymous();
        }
        ViewerContext::new(level.or(self.membership_level.as_deref()))
    }
}
