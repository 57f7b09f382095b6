//! Component handlers and the registry that builds them
//!
//! A handler is built once per component and action, driven through the
//! action's hooks and then dropped. Handlers come in three kinds, one per
//! capability trait: [`Installer`] for INSTALL, [`Runtime`] for START and
//! STOP, [`Uninstaller`] for UNINSTALL.

use crate::action::{Action, Hook};
use crate::component::{Catalog, ComponentName};
use crate::context::HandlerArgs;
use crate::packaging::PackageError;
use crate::{Error, Result};
use async_trait::async_trait;
use stack_config::ConfigError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of a hook
pub type HookResult<T> = std::result::Result<T, HookError>;

/// What a hook reports back about its work
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Trace {
    /// Trace files worth inspecting
    Paths(Vec<PathBuf>),
    /// Number of items handled
    Count(usize),
    /// Nothing to report
    #[default]
    None,
}

/// Hook failures
#[derive(thiserror::Error, Debug)]
pub enum HookError {
    /// A trace left by an earlier action is missing
    #[error("No trace found for {component} at {}", .path.display())]
    NoTrace {
        /// Component whose trace is missing
        component: ComponentName,
        /// Expected trace location
        path: PathBuf,
    },

    /// A command failed
    #[error("Command failed: {0}")]
    Command(#[from] command_executor::Error),

    /// The package manager failed
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// A config value could not be resolved
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure
    #[error("{0}")]
    Failed(String),
}

impl HookError {
    /// Create a missing trace error
    pub fn no_trace(component: &ComponentName, path: impl Into<PathBuf>) -> Self {
        Self::NoTrace {
            component: component.clone(),
            path: path.into(),
        }
    }

    /// Create a generic failure
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    /// Whether this is a missing trace
    pub fn is_no_trace(&self) -> bool {
        matches!(self, Self::NoTrace { .. })
    }
}

/// Handler for the INSTALL action
#[async_trait]
pub trait Installer: Send {
    /// Fetch sources, returns the number of downloads
    async fn download(&mut self) -> HookResult<usize> {
        Ok(0)
    }

    /// Render configuration, returns the number of items configured
    async fn configure(&mut self) -> HookResult<usize> {
        Ok(0)
    }

    /// Prepare for installation
    async fn pre_install(&mut self) -> HookResult<()> {
        Ok(())
    }

    /// Install packages
    async fn install(&mut self) -> HookResult<()>;

    /// Finish installation, returns the install trace
    async fn post_install(&mut self) -> HookResult<Trace> {
        Ok(Trace::None)
    }
}

/// Handler for the START and STOP actions
#[async_trait]
pub trait Runtime: Send {
    /// Prepare for start
    async fn pre_start(&mut self) -> HookResult<()> {
        Ok(())
    }

    /// Start the component, returns the start trace
    async fn start(&mut self) -> HookResult<Trace>;

    /// Finish start
    async fn post_start(&mut self) -> HookResult<()> {
        Ok(())
    }

    /// Stop the component, returns the number of items stopped
    async fn stop(&mut self) -> HookResult<usize>;
}

/// Handler for the UNINSTALL action
#[async_trait]
pub trait Uninstaller: Send {
    /// Remove configuration, returns the number of items removed
    async fn unconfigure(&mut self) -> HookResult<usize> {
        Ok(0)
    }

    /// Remove packages and files
    async fn uninstall(&mut self) -> HookResult<()>;
}

/// A built handler
pub enum Handler {
    /// INSTALL handler
    Installer(Box<dyn Installer>),
    /// START/STOP handler
    Runtime(Box<dyn Runtime>),
    /// UNINSTALL handler
    Uninstaller(Box<dyn Uninstaller>),
}

impl Handler {
    fn kind(&self) -> &'static str {
        match self {
            Handler::Installer(_) => "installer",
            Handler::Runtime(_) => "runtime",
            Handler::Uninstaller(_) => "uninstaller",
        }
    }

    /// Run one hook
    ///
    /// Counts are reported as [`Trace::Count`] and hooks without a result
    /// as [`Trace::None`].
    pub async fn invoke(&mut self, hook: Hook) -> HookResult<Trace> {
        match (self, hook) {
            (Handler::Installer(h), Hook::Download) => h.download().await.map(Trace::Count),
            (Handler::Installer(h), Hook::Configure) => h.configure().await.map(Trace::Count),
            (Handler::Installer(h), Hook::PreInstall) => h.pre_install().await.map(|_| Trace::None),
            (Handler::Installer(h), Hook::Install) => h.install().await.map(|_| Trace::None),
            (Handler::Installer(h), Hook::PostInstall) => h.post_install().await,
            (Handler::Runtime(h), Hook::PreStart) => h.pre_start().await.map(|_| Trace::None),
            (Handler::Runtime(h), Hook::Start) => h.start().await,
            (Handler::Runtime(h), Hook::PostStart) => h.post_start().await.map(|_| Trace::None),
            (Handler::Runtime(h), Hook::Stop) => h.stop().await.map(Trace::Count),
            (Handler::Uninstaller(h), Hook::Unconfigure) => h.unconfigure().await.map(Trace::Count),
            (Handler::Uninstaller(h), Hook::Uninstall) => h.uninstall().await.map(|_| Trace::None),
            (handler, hook) => Err(HookError::failed(format!(
                "{} handler has no {} hook",
                handler.kind(),
                hook
            ))),
        }
    }
}

/// Factory building an installer
pub type InstallerFactory =
    Arc<dyn Fn(HandlerArgs) -> HookResult<Box<dyn Installer>> + Send + Sync>;

/// Factory building a runtime
pub type RuntimeFactory = Arc<dyn Fn(HandlerArgs) -> HookResult<Box<dyn Runtime>> + Send + Sync>;

/// Factory building an uninstaller
pub type UninstallerFactory =
    Arc<dyn Fn(HandlerArgs) -> HookResult<Box<dyn Uninstaller>> + Send + Sync>;

#[derive(Clone)]
enum HandlerFactory {
    Installer(InstallerFactory),
    Runtime(RuntimeFactory),
    Uninstaller(UninstallerFactory),
}

impl HandlerFactory {
    fn build(&self, args: HandlerArgs) -> HookResult<Handler> {
        Ok(match self {
            HandlerFactory::Installer(f) => Handler::Installer(f(args)?),
            HandlerFactory::Runtime(f) => Handler::Runtime(f(args)?),
            HandlerFactory::Uninstaller(f) => Handler::Uninstaller(f(args)?),
        })
    }
}

/// Registry mapping `(action, component)` to a handler factory
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: HashMap<(Action, ComponentName), HandlerFactory>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the configuration driven handlers for every catalog component
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut registry = Self::new();
        crate::generic::register(&mut registry, catalog);
        registry
    }

    /// Register the INSTALL handler of a component
    pub fn register_installer<F>(&mut self, component: impl Into<ComponentName>, factory: F)
    where
        F: Fn(HandlerArgs) -> HookResult<Box<dyn Installer>> + Send + Sync + 'static,
    {
        self.factories.insert(
            (Action::Install, component.into()),
            HandlerFactory::Installer(Arc::new(factory)),
        );
    }

    /// Register the START and STOP handler of a component
    pub fn register_runtime<F>(&mut self, component: impl Into<ComponentName>, factory: F)
    where
        F: Fn(HandlerArgs) -> HookResult<Box<dyn Runtime>> + Send + Sync + 'static,
    {
        let component = component.into();
        let factory = HandlerFactory::Runtime(Arc::new(factory));
        self.factories
            .insert((Action::Start, component.clone()), factory.clone());
        self.factories.insert((Action::Stop, component), factory);
    }

    /// Register the UNINSTALL handler of a component
    pub fn register_uninstaller<F>(&mut self, component: impl Into<ComponentName>, factory: F)
    where
        F: Fn(HandlerArgs) -> HookResult<Box<dyn Uninstaller>> + Send + Sync + 'static,
    {
        self.factories.insert(
            (Action::Uninstall, component.into()),
            HandlerFactory::Uninstaller(Arc::new(factory)),
        );
    }

    /// Whether a handler is registered
    pub fn contains(&self, action: Action, component: &ComponentName) -> bool {
        self.factories.contains_key(&(action, component.clone()))
    }

    /// Build the handler for `args.component`
    pub fn build(&self, action: Action, args: HandlerArgs) -> Result<Handler> {
        let component = args.component.clone();
        let factory = self
            .factories
            .get(&(action, component.clone()))
            .ok_or_else(|| Error::NoHandler {
                action,
                component: component.clone(),
            })?;

        factory.build(args).map_err(|source| Error::HandlerInit {
            action,
            component,
            source,
        })
    }

    /// Number of registered `(action, component)` entries
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.factories.keys().collect();
        keys.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopRuntime;

    #[async_trait]
    impl Runtime for NoopRuntime {
        async fn start(&mut self) -> HookResult<Trace> {
            Ok(Trace::Count(1))
        }

        async fn stop(&mut self) -> HookResult<usize> {
            Ok(1)
        }
    }

    #[test]
    fn test_runtime_registers_start_and_stop() {
        let mut registry = HandlerRegistry::new();
        registry.register_runtime("rabbit", |_| Ok(Box::new(NoopRuntime) as Box<dyn Runtime>));

        let rabbit = ComponentName::new("rabbit");
        assert!(registry.contains(Action::Start, &rabbit));
        assert!(registry.contains(Action::Stop, &rabbit));
        assert!(!registry.contains(Action::Install, &rabbit));
        assert!(!registry.contains(Action::Uninstall, &rabbit));
        assert_eq!(registry.len(), 2);
    }

    #[smol_potat::test]
    async fn test_invoke_maps_results() {
        let mut handler = Handler::Runtime(Box::new(NoopRuntime));
        assert_eq!(handler.invoke(Hook::PreStart).await.unwrap(), Trace::None);
        assert_eq!(handler.invoke(Hook::Start).await.unwrap(), Trace::Count(1));
        assert_eq!(handler.invoke(Hook::Stop).await.unwrap(), Trace::Count(1));
        assert!(matches!(
            handler.invoke(Hook::Download).await,
            Err(HookError::Failed(_))
        ));
    }

    #[test]
    fn test_no_trace_error() {
        let err = HookError::no_trace(&ComponentName::new("db"), "/opt/stack/db/traces/start.trace");
        assert!(err.is_no_trace());
        assert_eq!(
            err.to_string(),
            "No trace found for db at /opt/stack/db/traces/start.trace"
        );
        assert!(!HookError::failed("boom").is_no_trace());
    }
}
