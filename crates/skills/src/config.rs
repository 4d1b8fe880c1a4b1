//! Resolver configuration: cache location, install location and HTTP settings.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use {
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::error::{Error, Result};

/// Application directory name under the platform cache root.
pub const APP_DIR: &str = "mcphub";

/// Fixed per-call timeout for HTTP fetches, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// User-Agent sent on every outbound HTTP request.
pub const DEFAULT_USER_AGENT: &str = concat!("mcphub-skills/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    /// Overrides the platform cache root used for git clones.
    pub cache_dir: Option<PathBuf>,
    /// Where skills are installed (`<install_dir>/<install-name>/`).
    pub install_dir: Option<PathBuf>,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    /// Register the Mintlify provider ahead of the plain direct provider.
    pub enable_mintlify: bool,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            install_dir: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            enable_mintlify: false,
        }
    }
}

impl SkillsConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file missing, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read config {}", path.display()), e))?;
        toml::from_str(&raw).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Platform config location, e.g. `~/.config/mcphub/mcphub.toml`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_DIR)
            .map(|dirs| dirs.config_dir().join(format!("{APP_DIR}.toml")))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Directory holding cached git clones: `<cache-root>/mcphub/skills`.
    pub fn skills_cache_dir(&self) -> PathBuf {
        let root = self
            .cache_dir
            .clone()
            .or_else(|| directories::BaseDirs::new().map(|d| d.cache_dir().to_path_buf()))
            .unwrap_or_else(std::env::temp_dir);
        root.join(APP_DIR).join("skills")
    }

    /// Install root: explicit setting, else `~/.agents/skills`, else `./skills`.
    pub fn install_dir(&self) -> PathBuf {
        if let Some(dir) = &self.install_dir {
            return dir.clone();
        }
        directories::BaseDirs::new()
            .map(|d| d.home_dir().join(".agents").join("skills"))
            .unwrap_or_else(|| PathBuf::from("skills"))
    }
}
