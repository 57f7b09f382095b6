//! Component names, the component catalog and component list parsing

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use stack_config::{ComponentDef, Config};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Name of a component in the catalog
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentName(String);

impl ComponentName {
    /// Create a component name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ComponentName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for ComponentName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for ComponentName {
    fn as_ref(&self) -> &std::path::Path {
        self.0.as_ref()
    }
}

/// Per-run options keyed by component
pub type ComponentOptions = BTreeMap<ComponentName, Vec<String>>;

/// Catalog entry for one component
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    /// Component name
    pub name: ComponentName,
    /// Ordering key, lower runs first
    pub priority: u32,
    /// Components this one requires
    pub dependencies: BTreeSet<ComponentName>,
    /// Packages, config files, downloads and processes
    pub definition: ComponentDef,
}

impl ComponentSpec {
    /// Create a spec without dependencies
    pub fn new(name: impl Into<ComponentName>, priority: u32) -> Self {
        Self {
            name: name.into(),
            priority,
            dependencies: BTreeSet::new(),
            definition: ComponentDef {
                priority,
                ..ComponentDef::default()
            },
        }
    }

    /// Add dependencies
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ComponentName>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Replace the definition, keeping the catalog priority
    pub fn with_definition(mut self, definition: ComponentDef) -> Self {
        self.definition = ComponentDef {
            priority: self.priority,
            ..definition
        };
        self
    }

    fn from_def(name: &str, def: &ComponentDef) -> Self {
        Self {
            name: ComponentName::new(name),
            priority: def.priority,
            dependencies: def.dependencies.iter().map(|d| ComponentName::new(d.trim())).collect(),
            definition: def.clone(),
        }
    }
}

/// Static catalog of components, built once at startup
///
/// Every dependency edge between two catalog components goes from a higher
/// to a strictly lower priority. This rules out cycles and makes ordering by
/// priority run dependencies first. Dependencies that name
/// components outside the catalog are kept as opaque names.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    components: BTreeMap<ComponentName, ComponentSpec>,
}

impl Catalog {
    /// Build and validate a catalog from component specs
    pub fn new(specs: impl IntoIterator<Item = ComponentSpec>) -> Result<Self> {
        let catalog = Self {
            components: specs.into_iter().map(|s| (s.name.clone(), s)).collect(),
        };
        catalog.validate()?;
        debug!("Loaded catalog with {} components", catalog.len());
        Ok(catalog)
    }

    /// Build and validate a catalog from the `components` section of a config
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config
                .components
                .iter()
                .map(|(name, def)| ComponentSpec::from_def(name, def)),
        )
    }

    /// Look up a component
    pub fn get(&self, name: &str) -> Option<&ComponentSpec> {
        self.components.get(name)
    }

    /// Check whether a component is in the catalog
    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Priority of a component
    pub fn priority(&self, name: &str) -> Option<u32> {
        self.get(name).map(|spec| spec.priority)
    }

    /// Direct dependencies of a component, empty when unknown
    pub fn dependencies(&self, name: &str) -> impl Iterator<Item = &ComponentName> {
        self.get(name).into_iter().flat_map(|spec| spec.dependencies.iter())
    }

    /// Components in name order
    pub fn iter(&self) -> impl Iterator<Item = &ComponentSpec> {
        self.components.values()
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    fn validate(&self) -> Result<()> {
        for spec in self.components.values() {
            for dep in &spec.dependencies {
                if *dep == spec.name {
                    return Err(Error::InvalidCatalog(format!(
                        "Component '{}' depends on itself",
                        spec.name
                    )));
                }

                let Some(dep_priority) = self.priority(dep.as_str()) else {
                    continue;
                };

                if dep_priority >= spec.priority {
                    return Err(Error::InvalidCatalog(format!(
                        "Component '{}' (priority {}) depends on '{}' (priority {}), \
                         dependencies must have a lower priority",
                        spec.name, spec.priority, dep, dep_priority
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Parse a component list of the form `a,b(opt1,opt2),c`
///
/// Options of a component named more than once are concatenated.
pub fn parse_component_list(input: &str) -> Result<ComponentOptions> {
    let mut components = ComponentOptions::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        let end = rest.find([',', '(']).unwrap_or(rest.len());
        let name = rest[..end].trim();
        if name.is_empty() || name.contains(')') {
            return Err(Error::InvalidComponentList(input.to_string()));
        }
        rest = &rest[end..];

        let mut options = Vec::new();
        if let Some(after_paren) = rest.strip_prefix('(') {
            let close = after_paren
                .find(')')
                .ok_or_else(|| Error::InvalidComponentList(input.to_string()))?;
            let inner = &after_paren[..close];
            if inner.contains('(') {
                return Err(Error::InvalidComponentList(input.to_string()));
            }
            options.extend(
                inner
                    .split(',')
                    .map(str::trim)
                    .filter(|opt| !opt.is_empty())
                    .map(str::to_string),
            );
            rest = after_paren[close + 1..].trim_start();
        }

        components
            .entry(ComponentName::new(name))
            .or_default()
            .extend(options);

        rest = match rest.strip_prefix(',') {
            Some(next) => next.trim_start(),
            None if rest.is_empty() => rest,
            None => return Err(Error::InvalidComponentList(input.to_string())),
        };
    }

    Ok(components)
}
