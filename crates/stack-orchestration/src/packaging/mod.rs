//! Distribution package management
//!
//! Component handlers install and remove distribution packages through the
//! [`PackageManager`] of the run context. The backend is picked from the
//! detected [`Distro`](crate::Distro).

mod apt;
mod yum;

pub use apt::AptPackager;
pub use yum::YumPackager;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stack_config::PackageDef;
use std::fmt;

/// Package management errors
#[derive(thiserror::Error, Debug)]
pub enum PackageError {
    /// The package tool failed
    #[error("Package command failed: {0}")]
    Command(#[from] command_executor::Error),
}

/// A distribution package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Package name
    pub name: String,
    /// Pinned version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// RPM to install before the package (yum only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_rpm: Option<String>,
    /// Purge configuration on removal (apt only)
    #[serde(default)]
    pub purge: bool,
}

impl Package {
    /// Unpinned package
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            source_rpm: None,
            purge: false,
        }
    }

    /// Pin a version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl From<&PackageDef> for Package {
    fn from(def: &PackageDef) -> Self {
        Self {
            name: def.name.clone(),
            version: def.version.clone(),
            source_rpm: def.source_rpm.clone(),
            purge: def.purge,
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} ({})", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

/// Package manager backend
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Install a package
    async fn install(&self, package: &Package) -> Result<(), PackageError>;

    /// Remove a package, returns `false` when it was not installed
    async fn remove(&self, package: &Package) -> Result<bool, PackageError>;

    /// Whether a package is installed
    async fn is_installed(&self, name: &str) -> Result<bool, PackageError>;
}
