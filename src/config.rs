use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;
use verdant_core::ContentRegistry;
use verdant_world::SimConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/verdant.toml";

/// Runner configuration: the world tunables plus where content comes from.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// JSON content pack replacing the built-in base pack.
    pub content_pack: Option<String>,
    pub world: SimConfig,
}

impl RunnerConfig {
    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<RunnerConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    RunnerConfig::default()
                }
            },
            Err(err) => {
                if path != Path::new(DEFAULT_CONFIG_PATH)
                    || err.kind() != std::io::ErrorKind::NotFound
                {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!("Config not found at {}. Using defaults", path.display());
                }
                RunnerConfig::default()
            }
        }
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    /// Load the configured content pack, or the built-in one.
    ///
    /// Unlike the config file, a broken content pack is fatal.
    pub fn load_content(&self) -> Result<ContentRegistry> {
        match &self.content_pack {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("reading content pack {path}"))?;
                ContentRegistry::from_json_str(&json)
                    .with_context(|| format!("loading content pack {path}"))
            }
            None => Ok(ContentRegistry::builtin()?),
        }
    }
}
