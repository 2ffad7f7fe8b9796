use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::Pager;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddockConfig {
    /// Name of (or path to) the provisioning tool binary.
    #[serde(default = "default_tool")]
    pub tool: String,
    /// How many environment tabs fit on one page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_tool() -> String {
    "vagrant".to_string()
}

fn default_page_size() -> usize {
    Pager::DEFAULT_PER_PAGE
}

impl Default for PaddockConfig {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: PaddockConfig,
}

fn config_directory() -> Option<PathBuf> {
    if let Some(path) = dirs::config_dir() {
        return Some(path.join("paddock"));
    }

    dirs::home_dir().map(|path| path.join(".config").join("paddock"))
}

pub fn config_path() -> Option<PathBuf> {
    config_directory().map(|path| path.join("config.toml"))
}

pub fn load() -> Result<LoadedConfig, String> {
    let path = config_path().ok_or_else(|| "cannot resolve config path".to_string())?;
    let config = load_from_path(&path)?;
    Ok(LoadedConfig { path, config })
}

pub fn load_from_path(path: &Path) -> Result<PaddockConfig, String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Ok(PaddockConfig::default());
        }
        Err(error) => return Err(format!("config read failed: {error}")),
    };

    toml::from_str::<PaddockConfig>(&raw).map_err(|error| format!("config parse failed: {error}"))
}

pub fn save_to_path(path: &Path, config: &PaddockConfig) -> Result<(), String> {
    let Some(parent) = path.parent() else {
        return Err("config path missing parent directory".to_string());
    };

    fs::create_dir_all(parent)
        .map_err(|error| format!("config directory create failed: {error}"))?;
    let encoded =
        toml::to_string_pretty(config).map_err(|error| format!("config encode failed: {error}"))?;
    fs::write(path, encoded).map_err(|error| format!("config write failed: {error}"))
}
