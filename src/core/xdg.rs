//! XDG Base Directory support
//!
//! Resolves where the configuration file lives. The index itself is
//! held in memory, so no data or state directories are needed.

use std::env;
use std::path::PathBuf;

/// XDG directory structure for siteindex
#[derive(Debug, Clone)]
pub struct XdgDirs {
    pub config_dir: PathBuf,
}

impl XdgDirs {
    /// Resolve directories from the environment
    ///
    /// Priority order (highest to lowest):
    /// 1. XDG_CONFIG_HOME
    /// 2. Platform config dir (~/.config on Linux)
    /// 3. ~/.config
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_config_dir(),
        }
    }

    /// Use an explicit config directory
    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    fn resolve_config_dir() -> PathBuf {
        if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
            if !xdg.is_empty() {
                return PathBuf::from(xdg).join("siteindex");
            }
        }

        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("siteindex")
    }

    /// Path of the config file inside the config directory
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

impl Default for XdgDirs {
    fn default() -> Self {
        Self::new()
    }
}
