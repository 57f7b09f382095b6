//! Configuration parser

use crate::{Config, ConfigError, Result};
use std::path::Path;
use tracing::debug;

/// Parse a YAML configuration file
pub fn parse_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    debug!("Loading config from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parse YAML configuration from a string
pub fn parse_str(content: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration
///
/// Dependencies may name components that are not in the catalog; those are
/// carried as opaque names and fail later when no handler exists for them.
/// Priority and cycle checks happen when the catalog is built.
fn validate_config(config: &Config) -> Result<()> {
    if config.version != "1.0" {
        return Err(ConfigError::ValidationError(format!(
            "Unsupported version: {}, expected 1.0",
            config.version
        )));
    }

    if config.components.is_empty() {
        return Err(ConfigError::ValidationError(
            "No components defined".to_string(),
        ));
    }

    for (name, component) in &config.components {
        if name.trim().is_empty() || name.contains(['(', ')', ',']) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid component name '{}'",
                name
            )));
        }

        for package in &component.packages {
            if package.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Component '{}' declares a package without a name",
                    name
                )));
            }
        }

        if component.dependencies.iter().any(|dep| dep.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "Component '{}' declares an empty dependency",
                name
            )));
        }
    }

    Ok(())
}
