use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::model::config::TaskyConfig;

/// Config file name looked up inside the store directory
pub const CONFIG_FILE: &str = "tasky.toml";
/// Store directory used when nothing else names one
pub const DEFAULT_STORE_DIR: &str = ".tasky";
/// Environment variable naming the store directory
pub const STORE_DIR_ENV: &str = "TASKY_DIR";

/// Error type for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Read a config file. A missing file yields the defaults.
pub fn read_config(path: &Path) -> Result<TaskyConfig, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(TaskyConfig::default());
        }
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Where the config and the data live for one invocation
#[derive(Debug, Clone)]
pub struct Resolved {
    pub config: TaskyConfig,
    pub store_dir: PathBuf,
}

/// Resolve config and store directory.
///
/// Store dir precedence: explicit flag, `TASKY_DIR`, `[storage] dir` from
/// the config, then `./.tasky`. The config comes from `--config` if given,
/// else `tasky.toml` inside the store dir picked without the config.
pub fn resolve(
    flag_dir: Option<&Path>,
    env_dir: Option<&Path>,
    config_path: Option<&Path>,
    cwd: &Path,
) -> Result<Resolved, ConfigError> {
    let early_dir = flag_dir
        .or(env_dir)
        .map(|d| cwd.join(d))
        .unwrap_or_else(|| cwd.join(DEFAULT_STORE_DIR));

    let config_file = match config_path {
        Some(p) => cwd.join(p),
        None => early_dir.join(CONFIG_FILE),
    };
    let config = read_config(&config_file)?;

    let store_dir = match (flag_dir.or(env_dir), &config.storage.dir) {
        (Some(_), _) => early_dir,
        (None, Some(dir)) => config_file.parent().unwrap_or(cwd).join(dir),
        (None, None) => early_dir,
    };

    Ok(Resolved { config, store_dir })
}
