use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub cache: Option<CacheConfig>,
    pub concurrency: Option<ConcurrencyConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub dir: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    pub max_concurrent: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: Option<String>,
}

/// Platform config directory path: `<config_dir>/textmill/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("textmill").join("config.toml"))
}

/// Load config by cascading CWD `.textmill.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".textmill.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        cache: Some(CacheConfig {
            dir: overlay
                .cache
                .as_ref()
                .and_then(|c| c.dir.clone())
                .or_else(|| base.cache.as_ref().and_then(|c| c.dir.clone())),
            enabled: overlay
                .cache
                .as_ref()
                .and_then(|c| c.enabled)
                .or_else(|| base.cache.as_ref().and_then(|c| c.enabled)),
        }),
        concurrency: Some(ConcurrencyConfig {
            max_concurrent: overlay
                .concurrency
                .as_ref()
                .and_then(|c| c.max_concurrent)
                .or_else(|| base.concurrency.as_ref().and_then(|c| c.max_concurrent)),
        }),
        output: Some(OutputConfig {
            dir: overlay
                .output
                .as_ref()
                .and_then(|o| o.dir.clone())
                .or_else(|| base.output.as_ref().and_then(|o| o.dir.clone())),
        }),
    }
}
