use crate::error::LibraryError;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub min_size: u64,
    pub progress_every: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: ["jpg", "JPG", "jpeg", "JPEG"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            exclude: ["Thumbnails", "_face", "modelresources"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            min_size: 0,
            progress_every: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PartialLibraryConfig {
    scan: Option<ScanConfig>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_csv(var: &str, fallback: &[String]) -> Vec<String> {
    match env::var(var) {
        Ok(v) => {
            let out = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>();
            if out.is_empty() {
                fallback.to_vec()
            } else {
                out
            }
        }
        Err(_) => fallback.to_vec(),
    }
}

pub fn validate(cfg: &LibraryConfig) -> Result<(), LibraryError> {
    if cfg.scan.extensions.is_empty() {
        return Err(LibraryError::InvalidConfig(
            "at least one extension is required".to_string(),
        ));
    }
    if cfg.scan.extensions.iter().any(|ext| ext.trim().is_empty()) {
        return Err(LibraryError::InvalidConfig(
            "extensions cannot be empty strings".to_string(),
        ));
    }
    if cfg.scan.exclude.iter().any(|needle| needle.is_empty()) {
        return Err(LibraryError::InvalidConfig(
            "an empty exclude entry would exclude every file".to_string(),
        ));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("IMGLIB_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    if let Ok(home) = env::var("IMGLIB_HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed).join("config.toml"));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".image_library").join("config.toml"))
}

fn merge_file_config(base: &mut LibraryConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: PartialLibraryConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(scan) = parsed.scan {
        base.scan = scan;
    }
    Ok(())
}

/// Defaults, then the TOML file, then `IMGLIB_*` environment overrides.
pub fn load_config() -> Result<LibraryConfig> {
    let mut cfg = LibraryConfig::default();
    if let Some(path) = resolve_config_path() {
        merge_file_config(&mut cfg, &path)?;
    }

    cfg.scan.extensions = env_or_csv("IMGLIB_EXTENSIONS", &cfg.scan.extensions);
    cfg.scan.exclude = env_or_csv("IMGLIB_EXCLUDE", &cfg.scan.exclude);
    cfg.scan.min_size = env_or_u64("IMGLIB_MIN_SIZE", cfg.scan.min_size);
    cfg.scan.progress_every = env_or_u64("IMGLIB_PROGRESS_EVERY", cfg.scan.progress_every);

    validate(&cfg)?;
    Ok(cfg)
}
