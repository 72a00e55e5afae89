//! The main config loading module for rove.
//!
//! Handles loading and deserializing settings from `rove.toml`.
//!
//! Provides the main [Config] struct, as well as the internal [RawConfig] used for parsing.
//!
//! Also implements default config generation for `rove --init`.

use crate::config::{General, InternalGeneral, InternalPerformance, Performance};

use serde::Deserialize;
use tracing::{info, warn};

use std::path::{Path, PathBuf};
use std::{fs, io};

/// Raw configuration as read from the toml file.
/// Converted into the main [Config] struct, which clamps out of range values.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub(crate) struct RawConfig {
    general: General,
    performance: Performance,
}

/// Main configuration struct for rove.
#[derive(Debug, Clone)]
pub struct Config {
    general: InternalGeneral,
    performance: InternalPerformance,
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Self {
            general: InternalGeneral::from(raw.general),
            performance: InternalPerformance::from(raw.performance),
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    /// If the file does not exist or fails to parse, returns the default configuration.
    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!(
                path = %path.display(),
                "no config file found, using internal defaults (tip: run 'rove --init')"
            );
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match Self::from_toml(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "error parsing config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read config, using defaults");
                Self::default()
            }
        }
    }

    /// Parses a config from toml text.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<RawConfig>(content).map(Config::from)
    }

    #[inline]
    pub fn general(&self) -> &InternalGeneral {
        &self.general
    }

    #[inline]
    pub fn performance(&self) -> &InternalPerformance {
        &self.performance
    }

    /// Determine the default configuration file path.
    /// Checks the ROVE_CONFIG environment variable first,
    /// then XDG_CONFIG_HOME,
    /// then defaults to ~/.config/rove/rove.toml.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("ROVE_CONFIG") {
            return PathBuf::from(path);
        }

        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("rove/rove.toml");
        }

        if let Some(home) = dirs::home_dir() {
            return home.join(".config/rove/rove.toml");
        }
        PathBuf::from("rove.toml")
    }

    /// Generate a default configuration file at the specified path.
    /// If the file already exists, returns an error.
    pub fn generate_default(path: &Path) -> io::Result<()> {
        if path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("Config file already exists at {:?}", path),
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_TOML)?;
        println!("Default config generated at {:?}", path);
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

const DEFAULT_TOML: &str = r##"# rove.toml - default configuration for rove
#
# Commented values are the internal defaults.

[general]
# show_hidden = false
# dirs_first = true
# natural, name, size, modified, accessed, changed or extension
# sort_by = "natural"
# sort_reverse = false
# ignore_case = true
# ignore_diacritics = true
# smart_case = true
# smart_diacritics = true
# glob_search = false
# move_to_trash = false

[performance]
# preview_cache_size = 64
# listing_cache_size = 32
# preview_prune_interval_secs = 5
# history_depth = 100
# walker_concurrency = 16
# batch_workers = 8
# prewarm_depth = 2
"##;
