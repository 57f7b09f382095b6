//! # Stack Configuration
//!
//! YAML configuration for the stack orchestrator.
//!
//! This crate parses `stack.yaml` files describing the component catalog
//! (priorities, dependencies, packages, config files, downloads and
//! processes) together with the key/value sections consumed through the
//! [`ConfigStore`].

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod parser;
pub mod resolver;
pub mod store;

pub use store::ConfigStore;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// Config reference (`${section.key}`) not found
    #[error("Config reference not found: {0}")]
    ReferenceNotFound(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Optional deployment name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Global settings
    #[serde(default, skip_serializing_if = "Settings::is_default")]
    pub settings: Settings,

    /// Component catalog
    pub components: BTreeMap<String, ComponentDef>,

    /// Key/value sections served by the config store
    #[serde(default)]
    pub config: BTreeMap<String, BTreeMap<String, String>>,
}

/// Global settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Default log level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Distribution override (skips `/etc/os-release` detection)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distro: Option<String>,
}

impl Settings {
    /// Check if settings are default (all None)
    fn is_default(&self) -> bool {
        self == &Settings::default()
    }
}

/// Component definition
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComponentDef {
    /// Ordering key, lower runs first
    pub priority: u32,

    /// Optional human readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Components this component requires
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Distribution packages to install
    #[serde(default)]
    pub packages: Vec<PackageDef>,

    /// Config files rendered into the component's config directory,
    /// keyed by relative file name
    #[serde(default)]
    pub config_files: BTreeMap<String, String>,

    /// Source checkouts fetched during download
    #[serde(default)]
    pub downloads: Vec<DownloadDef>,

    /// Processes launched on start
    #[serde(default)]
    pub processes: Vec<ProcessDef>,
}

/// Distribution package
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageDef {
    /// Package name
    pub name: String,

    /// Optional pinned version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// RPM file or URL to install first (yum only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_rpm: Option<String>,

    /// Purge after removal (apt only)
    #[serde(default)]
    pub purge: bool,
}

/// Source checkout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadDef {
    /// Checkout directory name
    pub name: String,

    /// Git repository URL
    pub repo: String,

    /// Optional branch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Process launched by the component runtime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessDef {
    /// Process name, also used for its log file
    pub name: String,

    /// Program to run
    pub command: String,

    /// Command line arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment variables
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}
