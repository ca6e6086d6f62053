use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Overrides the settings file location.
pub const CONFIG_ENV: &str = "OPPORTUNITY_BOARD_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to resolve a home directory for project paths")]
    NoProjectDirs,
    #[error("unable to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub database_path: PathBuf,
    pub object_store_root: PathBuf,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "default_personal_key_days")]
    pub personal_api_key_days: u32,
}

fn default_log_filter() -> String {
    "opportunity_board=info".to_string()
}

fn default_personal_key_days() -> u32 {
    30
}

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("dev", "opportunity-board", "opportunity-board").ok_or(ConfigError::NoProjectDirs)
}

/// Directory holding the database and object store by default.
pub fn data_root() -> Result<PathBuf, ConfigError> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

pub fn settings_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(project_dirs()?.config_dir().join("settings.json"))
}

impl Settings {
    pub fn default_for(data_root: &Path) -> Self {
        Self {
            database_path: data_root.join("board.sqlite3"),
            object_store_root: data_root.join("objects"),
            log_filter: default_log_filter(),
            personal_api_key_days: default_personal_key_days(),
        }
    }

    pub fn personal_api_key_lifetime(&self) -> Duration {
        Duration::days(i64::from(self.personal_api_key_days))
    }
}

/// Reads settings from the platform location, writing defaults on first run.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(&settings_path()?, &data_root()?)
}

/// Reads `path`; a missing or blank file is replaced by defaults rooted at `data_root`.
pub fn load_settings_from(path: &Path, data_root: &Path) -> Result<Settings, ConfigError> {
    let raw = if path.exists() {
        fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        String::new()
    };
    if raw.trim().is_empty() {
        let defaults = Settings::default_for(data_root);
        save_settings_to(path, &defaults)?;
        return Ok(defaults);
    }
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let payload = serde_json::to_string_pretty(settings)?;
    fs::write(path, payload).map_err(io_error)
}
