//! Configuration loading for seekfile.
//!
//! Settings are layered, later layers winning:
//! 1. built-in defaults,
//! 2. the configuration file (`.json`, `.yaml`/`.yml`, anything else is TOML),
//! 3. environment variables prefixed with `SEEKFILE_`, such as
//!    `SEEKFILE_REBUILD_ON_START=true`.
//!
//! Relative paths are resolved against the directory containing the
//! configuration file, so a configuration behaves the same regardless of the
//! process working directory.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use seekfile_index::normalize_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "SEEKFILE_";
const DEFAULT_DATABASE: &str = "seekfile.db";

/// Settings as written by the user, before path resolution.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawConfig {
    scan_paths: Vec<String>,
    database_path: String,
    rebuild_on_start: bool,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Absolute, normalized root directories to index. Never empty.
    pub scan_paths: Vec<PathBuf>,
    /// Absolute path of the SQLite record store.
    pub database_path: PathBuf,
    /// Run a full scan at startup even when cached records exist.
    pub rebuild_on_start: bool,
}

impl Config {
    /// Platform configuration file location, e.g. `~/.config/seekfile/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "seekfile").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from an explicitly requested file, which must exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path = normalize_path(std::path::absolute(path).or_raise(|| ErrorKind::Path(path.to_path_buf()))?);
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path));
        }
        let base = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("/"));
        tracing::debug!(path = %path.display(), "Loading configuration file");
        Self::resolve(Self::figment(Some(&path)), &base)
    }

    /// Load from [`default_path`](Self::default_path) if that file exists,
    /// otherwise from defaults and the environment alone, relative to the
    /// current directory.
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::default_path()
            && path.is_file()
        {
            return Self::load(path);
        }
        let base = std::env::current_dir().or_raise(|| ErrorKind::Path(PathBuf::from(".")))?;
        Self::resolve(Self::figment(None), &base)
    }

    fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(RawConfig::default()));
        if let Some(file) = file {
            figment = match file.extension().and_then(|ext| ext.to_str()).map(str::to_lowercase).as_deref() {
                Some("json") => figment.merge(Json::file(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                _ => figment.merge(Toml::file(file)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    fn resolve(figment: Figment, base: &Path) -> Result<Self> {
        let raw: RawConfig = figment.extract().or_raise(|| ErrorKind::Extract)?;
        let base = normalize_path(base);

        let mut scan_paths = Vec::new();
        for path in raw.scan_paths.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            let path = normalize_path(base.join(path));
            if !scan_paths.contains(&path) {
                scan_paths.push(path);
            }
        }
        if scan_paths.is_empty() {
            tracing::debug!(base = %base.display(), "No scan paths configured; indexing the configuration directory");
            scan_paths.push(base.clone());
        }

        let database_path = match raw.database_path.trim() {
            "" => base.join(DEFAULT_DATABASE),
            path => normalize_path(base.join(path)),
        };

        Ok(Self {
            scan_paths,
            database_path,
            rebuild_on_start: raw.rebuild_on_start,
        })
    }
}
