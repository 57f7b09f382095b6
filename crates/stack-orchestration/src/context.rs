//! Shared state handed to every component handler during a run

use crate::component::{Catalog, ComponentName};
use crate::distro::Distro;
use crate::packaging::PackageManager;
use stack_config::ConfigStore;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Context for one run
///
/// Created once by the coordinator and shared with every handler. The active
/// set includes reference-only components so handlers can look up siblings
/// that are not acted upon.
#[derive(Clone)]
pub struct RunContext {
    /// Every component taking part in the run
    pub active_components: BTreeSet<ComponentName>,

    /// Host distribution
    pub distro: Distro,

    /// Package manager for the distribution
    pub packager: Arc<dyn PackageManager>,

    /// Configuration store
    pub config: Arc<ConfigStore>,

    /// Component catalog
    pub catalog: Arc<Catalog>,

    /// Root directory all components install under
    pub root: PathBuf,
}

impl RunContext {
    /// Whether a component takes part in the run
    pub fn is_active(&self, component: &str) -> bool {
        self.active_components.contains(component)
    }

    /// Root directory of the run
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory owned by a component
    pub fn component_dir(&self, component: &ComponentName) -> PathBuf {
        self.root.join(component)
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("active_components", &self.active_components)
            .field("distro", &self.distro)
            .field("packager", &self.packager.name())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Everything a handler factory receives
#[derive(Debug, Clone)]
pub struct HandlerArgs {
    /// Component the handler acts on
    pub component: ComponentName,

    /// Caller supplied options for the component
    pub options: Vec<String>,

    /// Shared run context
    pub context: Arc<RunContext>,
}
