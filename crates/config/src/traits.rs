//! Loading and saving configuration files.

use eyre::Context as _;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFmt {
    /// `.yaml`
    YAML,
    /// `.json`
    JSON,
}

impl ConfigFmt {
    fn decode<T: DeserializeOwned>(&self, contents: &str) -> eyre::Result<T> {
        Ok(match self {
            Self::YAML => serde_yaml::from_str(contents)?,
            Self::JSON => serde_json::from_str(contents)?,
        })
    }

    fn encode<T: Serialize>(&self, value: &T) -> eyre::Result<String> {
        Ok(match self {
            Self::YAML => serde_yaml::to_string(value)?,
            Self::JSON => serde_json::to_string_pretty(value)?,
        })
    }
}

/// Read and write configuration values.
pub trait ConfigTrait {
    /// Load a value from the file at `path`.
    fn load_from_path<T>(path: impl AsRef<Path>, fmt: ConfigFmt) -> eyre::Result<T>
    where
        T: DeserializeOwned,
    {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
        fmt.decode(&contents).wrap_err_with(|| format!("failed to parse config {}", path.display()))
    }

    /// Load a value from `path`, writing and returning the default if the file does not exist.
    fn load_from_path_or_default<T>(path: impl AsRef<Path>, fmt: ConfigFmt) -> eyre::Result<T>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        let path = path.as_ref();
        if path.exists() {
            return Self::load_from_path(path, fmt);
        }

        warn!(target: "dr::config", ?path, "config not found, writing default");
        let value = T::default();
        Self::write_to_path(path, &value, fmt)?;
        Ok(value)
    }

    /// Write a value to `path`, creating parent directories.
    fn write_to_path<T>(path: impl AsRef<Path>, value: &T, fmt: ConfigFmt) -> eyre::Result<()>
    where
        T: Serialize,
    {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, fmt.encode(value)?)
            .wrap_err_with(|| format!("failed to write config {}", path.display()))?;
        info!(target: "dr::config", ?path, "config written");
        Ok(())
    }
}

/// Entry point for configuration io.
#[derive(Debug)]
pub struct Config;

impl ConfigTrait for Config {}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_path(base: impl AsRef<Path>, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.as_ref().join(path)
    }
}
