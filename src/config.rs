// SPDX-FileCopyrightText: 2026 Watchtower contributors
// SPDX-License-Identifier: MIT

//! Configuration load/persist.
//!
//! One YAML file at `~/.config/watchtower/config.yaml`. A missing file yields
//! the defaults; the LLM API key can be overridden via `WATCHTOWER_LLM_API_KEY`.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_REFRESH_SECS: u64 = 120;
pub const DEFAULT_BRIEF_CACHE_MINS: u64 = 60;

const API_KEY_ENV: &str = "WATCHTOWER_LLM_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm_api_key: String,
    pub llm_model: String,
    pub location: Location,
    pub refresh_secs: u64,
    pub crypto_ids: Vec<String>,
    pub brief_cache_mins: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_model: "llama-3.1-8b-instant".to_owned(),
            location: Location::default(),
            refresh_secs: DEFAULT_REFRESH_SECS,
            crypto_ids: default_crypto_ids(),
            brief_cache_mins: DEFAULT_BRIEF_CACHE_MINS,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self {
            city: "Berlin".to_owned(),
            country: "DE".to_owned(),
            latitude: 52.52,
            longitude: 13.405,
        }
    }
}

fn default_crypto_ids() -> Vec<String> {
    ["bitcoin", "ethereum", "dogecoin", "usd-coin"]
        .into_iter()
        .map(ToOwned::to_owned)
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: serde_yaml::Error },
    NoConfigDir,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "reading config {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "parsing config {}: {source}", path.display())
            }
            ConfigError::NoConfigDir => write!(f, "cannot resolve a config directory"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::NoConfigDir => None,
        }
    }
}

/// Default on-disk location: `<config dir>/watchtower/config.yaml`.
pub fn default_path() -> Result<PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join("watchtower").join("config.yaml"))
}

/// Loads the config from `path`, falling back to defaults if the file is
/// absent. Defaults also fill any field the file omits.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(apply_env(Config::default())),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let cfg: Config = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(apply_env(normalize(cfg)))
}

/// Loads from the default path.
pub fn load() -> Result<Config, ConfigError> {
    load_from(&default_path()?)
}

/// Persists the config, creating the parent directory if needed.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let raw = serde_yaml::to_string(cfg).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, raw).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn normalize(mut cfg: Config) -> Config {
    if cfg.refresh_secs == 0 {
        cfg.refresh_secs = DEFAULT_REFRESH_SECS;
    }
    if cfg.crypto_ids.is_empty() {
        cfg.crypto_ids = default_crypto_ids();
    }
    if cfg.llm_model.is_empty() {
        cfg.llm_model = Config::default().llm_model;
    }
    cfg
}

fn apply_env(mut cfg: Config) -> Config {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.is_empty() {
            cfg.llm_api_key = key;
        }
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_from(&dir.path().join("nope.yaml")).expect("load");
        assert_eq!(cfg.refresh_secs, DEFAULT_REFRESH_SECS);
        assert_eq!(cfg.brief_cache_mins, DEFAULT_BRIEF_CACHE_MINS);
        assert_eq!(cfg.crypto_ids.len(), 4);
    }

    #[test]
    fn partial_file_is_filled_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        fs::write(&path, "location:\n  city: Lisbon\n  country: PT\n").expect("write");
        let cfg = load_from(&path).expect("load");
        assert_eq!(cfg.location.city, "Lisbon");
        assert_eq!(cfg.refresh_secs, DEFAULT_REFRESH_SECS);
        assert!(!cfg.crypto_ids.is_empty());
    }

    #[test]
    fn zero_refresh_normalizes_to_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        fs::write(&path, "refresh_secs: 0\n").expect("write");
        let cfg = load_from(&path).expect("load");
        assert_eq!(cfg.refresh_secs, DEFAULT_REFRESH_SECS);
    }

    #[test]
    fn zero_cache_mins_is_preserved() {
        // 0 intentionally disables the brief cache, so it must survive load.
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        fs::write(&path, "brief_cache_mins: 0\n").expect("write");
        let cfg = load_from(&path).expect("load");
        assert_eq!(cfg.brief_cache_mins, 0);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sub").join("config.yaml");
        let mut cfg = Config::default();
        cfg.location.city = "Osaka".to_owned();
        cfg.refresh_secs = 30;
        save_to(&cfg, &path).expect("save");
        let loaded = load_from(&path).expect("load");
        assert_eq!(loaded.location.city, "Osaka");
        assert_eq!(loaded.refresh_secs, 30);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        fs::write(&path, "refresh_secs: [not a number\n").expect("write");
        assert!(load_from(&path).is_err());
    }
}
