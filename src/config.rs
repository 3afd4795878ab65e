//! Configuration: signal role to trace name mapping and log level
//!
//! A configuration combines the defaults shipped with the crate and an
//! optional local JSON file. Local settings take precedence.

use crate::core::segment::Segment;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Defaults shipped with the crate
pub const DEFAULT_CONFIG: &str = include_str!("default_config.json");

/// Name of the local configuration file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "config.json";

/// Signal role -> candidate trace names, per plugin
pub type TraceConfigs = HashMap<String, HashMap<String, Vec<String>>>;

/// Which configuration layer to consult
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Only the shipped defaults
    Default,
    /// Only the local file
    Local,
    /// Local file, falling back to defaults
    Automatic,
}

/// One configuration layer as stored in JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub trace_configs: TraceConfigs,
}

impl ConfigFile {
    /// Parse a configuration layer from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Read a configuration layer from a file
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Layered configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    default: ConfigFile,
    local: ConfigFile,
}

impl Config {
    /// Build a configuration from explicit layers
    pub fn new(default: ConfigFile, local: ConfigFile) -> Self {
        Self { default, local }
    }

    /// Shipped defaults plus `config.json` from the working directory, if present
    pub fn load() -> Result<Self> {
        Self::load_from(LOCAL_CONFIG_FILE)
    }

    /// Shipped defaults plus the given local file, if it exists
    pub fn load_from<P: AsRef<Path>>(local_path: P) -> Result<Self> {
        let default = ConfigFile::from_json(DEFAULT_CONFIG)?;
        let local_path = local_path.as_ref();
        let local = if local_path.exists() {
            debug!(path = %local_path.display(), "reading local configuration");
            ConfigFile::read(local_path)?
        } else {
            info!(path = %local_path.display(), "no local configuration found");
            ConfigFile::default()
        };
        Ok(Self::new(default, local))
    }

    fn layers(&self, source: ConfigSource) -> Vec<&ConfigFile> {
        match source {
            ConfigSource::Default => vec![&self.default],
            ConfigSource::Local => vec![&self.local],
            ConfigSource::Automatic => vec![&self.local, &self.default],
        }
    }

    /// All signal roles configured for a plugin
    pub fn plugin_configuration(&self, plugin: &str) -> Option<&HashMap<String, Vec<String>>> {
        self.layers(ConfigSource::Automatic)
            .into_iter()
            .find_map(|layer| layer.trace_configs.get(plugin))
    }

    /// Candidate trace names for a signal role of a plugin
    ///
    /// The first layer that configures this role of the plugin decides.
    pub fn trace_configuration(&self, plugin: &str, signal: &str) -> Option<&[String]> {
        self.layers(ConfigSource::Automatic)
            .into_iter()
            .find_map(|layer| layer.trace_configs.get(plugin)?.get(signal))
            .map(Vec::as_slice)
    }

    /// Configured log level
    pub fn log_level(&self, source: ConfigSource) -> Option<&str> {
        self.layers(source)
            .into_iter()
            .find_map(|layer| layer.log_level.as_deref())
    }

    /// First configured trace for a signal role that the segment can see
    pub fn resolve_trace(&self, plugin: &str, signal: &str, segment: &Segment) -> Option<String> {
        let visible = segment.traces();
        self.trace_configuration(plugin, signal)?
            .iter()
            .find(|name| visible.contains(*name))
            .cloned()
    }
}
