use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct Config {
    // sqlite tower cache, created on first use
    pub database_path: PathBuf,
    // optional reference dataset ingested into the cache on startup
    pub dataset_path: Option<PathBuf>,

    #[serde(default)]
    pub unwiredlabs: UnwiredConfig,
}

#[derive(Default, Deserialize)]
pub struct UnwiredConfig {
    pub token: Option<String>,
    pub endpoint: Option<String>,
}

impl Config {
    /// API token from the config file, falling back to the UNWIREDLABS_TOKEN
    /// environment variable.
    pub fn token(&self) -> Result<String> {
        if let Some(token) = &self.unwiredlabs.token {
            return Ok(token.clone());
        }
        dotenvy::var("UNWIREDLABS_TOKEN")
            .context("no API token: set unwiredlabs.token in the config or UNWIREDLABS_TOKEN")
    }
}

pub fn load(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config = toml::from_str(&data).context("Failed to parse config")?;
    Ok(config)
}
