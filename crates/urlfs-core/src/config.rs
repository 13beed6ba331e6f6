use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Host configuration loaded from `~/.config/urlfs/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlfsConfig {
    /// Native folders scanned for plug-in modules.
    pub search_paths: Vec<String>,
    /// Whether modules marked unstable are skipped during scans.
    pub blocklist_enabled: bool,
    /// Optional name for the plug-in settings store (defaults to "Plugins").
    #[serde(default)]
    pub collection_name: Option<String>,
}

impl Default for UrlfsConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            blocklist_enabled: true,
            collection_name: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("urlfs")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<UrlfsConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = UrlfsConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: UrlfsConfig = toml::from_str(&data)?;
    Ok(cfg)
}
