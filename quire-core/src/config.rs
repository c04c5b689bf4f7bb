use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::UrlFormat;
use crate::template::EngineKind;

pub const CONFIG_FILE: &str = "quire.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parsing(#[from] toml::de::Error),
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub build: BuildSettings,
}

impl Config {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&data)?;

        Ok(config)
    }

    /// Reads `path` when it exists, defaults otherwise.
    pub fn read_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.is_file() {
            Self::read(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct SiteConfig {
    pub title: Option<String>,
    pub tagline: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: Some("Quire".into()),
            tagline: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(default)]
pub struct BuildSettings {
    pub url_format: UrlFormat,
    pub engine: EngineKind,
    pub minify: bool,
    pub prettify: bool,
    /// Rewrite absolute links to the site's own domain as root-relative.
    pub relative_links: bool,
}
