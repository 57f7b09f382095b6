//! # Stack Orchestration
//!
//! Lifecycle orchestration for a set of interdependent components installed
//! on one host.
//!
//! Given the components a user asked for and an [`Action`], the
//! [`RunCoordinator`] resolves transitive dependencies over the [`Catalog`],
//! orders the result by priority, builds one handler per component from the
//! [`HandlerRegistry`] and drives it through the fixed hook sequence of the
//! action. What a component actually does is up to its handler; the
//! orchestrator only knows the dependency graph, the priorities and the
//! uniform hook contract.
//!
//! ## Example
//!
//! ```rust,no_run
//! use stack_orchestration::{Catalog, HandlerRegistry, RunCoordinator, RunRequest};
//! use std::sync::Arc;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = stack_config::parser::parse_file("stack.yaml")?;
//! let catalog = Arc::new(Catalog::from_config(&config)?);
//! let registry = HandlerRegistry::from_catalog(&catalog);
//! let coordinator = RunCoordinator::new(catalog, registry, &config);
//!
//! let request = RunRequest::new("install", "/opt/stack")
//!     .with_components(stack_orchestration::parse_component_list("keystone")?);
//! let ok = smol::block_on(coordinator.run_action(request));
//! # let _ = ok;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod action;
mod component;
mod context;
mod coordinator;
mod distro;
pub mod generic;
mod handler;
mod ordering;
pub mod packaging;
mod resolver;
mod runner;
pub mod trace;

pub use action::{Action, Hook};
pub use component::{
    Catalog, ComponentName, ComponentOptions, ComponentSpec, parse_component_list,
};
pub use context::{HandlerArgs, RunContext};
pub use coordinator::{RunCoordinator, RunReport, RunRequest};
pub use distro::{Distro, PackagerKind};
pub use handler::{
    Handler, HandlerRegistry, HookError, HookResult, Installer, Runtime, Trace, Uninstaller,
};
pub use ordering::order;
pub use packaging::{Package, PackageError, PackageManager};
pub use resolver::resolve;
pub use runner::{ComponentOutcome, ComponentResult, LifecycleRunner, RunResult};

use std::path::PathBuf;

/// Error types for orchestration runs
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The run was requested without any component
    #[error("No components specified")]
    NoComponents,

    /// A requested or reference component is not in the catalog
    #[error("Unknown component: {0}")]
    UnknownComponent(ComponentName),

    /// The action string does not name a known action
    #[error("No valid action specified: {0:?}")]
    InvalidAction(String),

    /// The root directory is missing or unusable
    #[error("No valid root directory specified: {0}")]
    InvalidRootDir(String),

    /// Installing into a root directory that already has content
    #[error(
        "Root directory [{}] already exists (and it's not empty), remove it or uninstall components",
        .0.display()
    )]
    RootDirNotEmpty(PathBuf),

    /// The host distribution is not supported
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// A component list could not be parsed
    #[error("Invalid component list: {0}")]
    InvalidComponentList(String),

    /// The catalog violates its priority or acyclicity rules
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// No handler is registered for this action and component
    #[error("No {action} handler registered for component {component}")]
    NoHandler {
        /// Requested action
        action: Action,
        /// Component without a handler
        component: ComponentName,
    },

    /// The handler factory failed to build a handler
    #[error("Failed to prepare {action} handler for {component}: {source}")]
    HandlerInit {
        /// Requested action
        action: Action,
        /// Component whose handler failed
        component: ComponentName,
        /// Underlying failure
        source: HookError,
    },

    /// A lifecycle hook failed
    #[error("{hook} of {component} failed: {source}")]
    Hook {
        /// Component whose hook failed
        component: ComponentName,
        /// The failing hook
        hook: Hook,
        /// Underlying failure
        source: HookError,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] stack_config::ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, Error>;
