use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::scanner::WalkOptions;

pub const DATABASE_FILE_NAME: &str = "music_tracker.db";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const ENV_PREFIX: &str = "MUSIC_TRACKER";

/// Per-user config directory, e.g. `~/.config/music-tracker` on Linux.
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "music-tracker").map(|dirs| dirs.config_dir().to_path_buf())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = config_dir()
            .map(|dir| dir.join(DATABASE_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME));
        Self { path }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    pub follow_symlinks: bool,
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub colors: bool,
    /// Rows shown by `list` when no `--limit` is given.
    pub page_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            colors: true,
            page_size: 50,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub database: DatabaseConfig,
    pub scanning: ScanningConfig,
    pub output: OutputConfig,
}

impl CliConfig {
    /// Load defaults, then `<config_dir>/config.toml` if present, then
    /// `MUSIC_TRACKER__SECTION__KEY` environment variables.
    pub fn load() -> Result<Self> {
        let file = config_dir().map(|dir| dir.join(CONFIG_FILE_NAME));
        Self::load_from(file.as_deref())
    }

    /// Same layering as [`CliConfig::load`] with an explicit config file.
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(false));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database.path = path.into();
        self
    }

    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            follow_symlinks: self.scanning.follow_symlinks,
            max_depth: self.scanning.max_depth,
        }
    }

    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
