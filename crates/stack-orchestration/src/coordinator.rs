//! Run coordinator, the entry point for one action over a set of components

use crate::action::Action;
use crate::component::{Catalog, ComponentName, ComponentOptions};
use crate::context::RunContext;
use crate::distro::Distro;
use crate::handler::HandlerRegistry;
use crate::ordering::order;
use crate::packaging::PackageManager;
use crate::resolver::resolve;
use crate::runner::{LifecycleRunner, RunResult, display_paths};
use crate::{Error, Result};
use chrono::Utc;
use stack_config::store::PASSWORD_SECTION;
use stack_config::{Config, ConfigStore};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Everything the caller asks for in one run
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Selected components with their options
    pub components: ComponentOptions,
    /// Action name, validated by the coordinator
    pub action: String,
    /// Root directory components install under
    pub root_dir: PathBuf,
    /// Skip dependency resolution
    pub ignore_deps: bool,
    /// Components visible to handlers but not acted upon
    pub ref_components: ComponentOptions,
    /// Skip components whose trace is missing during STOP and UNINSTALL
    pub force: bool,
}

impl RunRequest {
    /// Request for `action` under `root_dir`
    pub fn new(action: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            action: action.into(),
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Set the selected components
    pub fn with_components(mut self, components: ComponentOptions) -> Self {
        self.components = components;
        self
    }

    /// Set the reference-only components
    pub fn with_ref_components(mut self, components: ComponentOptions) -> Self {
        self.ref_components = components;
        self
    }

    /// Skip dependency resolution
    pub fn ignore_deps(mut self, ignore: bool) -> Self {
        self.ignore_deps = ignore;
        self
    }

    /// Tolerate missing traces during teardown
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Summary of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Action that ran
    pub action: Action,
    /// Distribution the run targeted
    pub distro: Distro,
    /// Components the action was applied to, in order
    pub order: Vec<ComponentName>,
    /// Components added by dependency resolution
    pub implicit_components: BTreeSet<ComponentName>,
    /// Every component handlers could see, reference-only ones included
    pub active_components: BTreeSet<ComponentName>,
    /// Per component outcomes
    pub result: RunResult,
}

/// Validates a request, resolves and orders components and runs the action
pub struct RunCoordinator {
    catalog: Arc<Catalog>,
    registry: HandlerRegistry,
    config: Arc<ConfigStore>,
    distro_setting: Option<String>,
    distro: Option<Distro>,
    packager: Option<Arc<dyn PackageManager>>,
}

impl RunCoordinator {
    /// Coordinator using the config store and distro setting of `config`
    pub fn new(catalog: Arc<Catalog>, registry: HandlerRegistry, config: &Config) -> Self {
        let mut coordinator =
            Self::with_store(catalog, registry, Arc::new(ConfigStore::from_config(config)));
        coordinator.distro_setting = config.settings.distro.clone();
        coordinator
    }

    /// Coordinator over an existing config store
    pub fn with_store(
        catalog: Arc<Catalog>,
        registry: HandlerRegistry,
        config: Arc<ConfigStore>,
    ) -> Self {
        Self {
            catalog,
            registry,
            config,
            distro_setting: None,
            distro: None,
            packager: None,
        }
    }

    /// Use this distribution instead of detecting one
    pub fn with_distro(mut self, distro: Distro) -> Self {
        self.distro = Some(distro);
        self
    }

    /// Use this package manager instead of the distribution's
    pub fn with_packager(mut self, packager: Arc<dyn PackageManager>) -> Self {
        self.packager = Some(packager);
        self
    }

    /// Component catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Config store shared with handlers
    pub fn config_store(&self) -> &ConfigStore {
        &self.config
    }

    /// Run a request, logging any failure
    ///
    /// Returns `true` when the run completed.
    pub async fn run_action(&self, request: RunRequest) -> bool {
        match self.execute(request).await {
            Ok(_) => true,
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }

    /// Run a request
    pub async fn execute(&self, request: RunRequest) -> Result<RunReport> {
        let RunRequest {
            components: mut selected,
            action,
            root_dir,
            ignore_deps,
            ref_components,
            force,
        } = request;

        if selected.is_empty() {
            return Err(Error::NoComponents);
        }
        if let Some(unknown) = selected
            .keys()
            .chain(ref_components.keys())
            .find(|c| !self.catalog.contains(c.as_str()))
        {
            return Err(Error::UnknownComponent(unknown.clone()));
        }

        let action: Action = action.parse()?;
        check_root(action, &root_dir)?;
        let distro = self.distro()?;
        let packager = self
            .packager
            .clone()
            .unwrap_or_else(|| distro.package_manager());

        info!("{}", action.banner());

        let mut implicit_components = BTreeSet::new();
        if !ignore_deps {
            let resolved = resolve(&self.catalog, selected.keys(), false);
            implicit_components = resolved
                .into_iter()
                .filter(|c| !selected.contains_key(c))
                .collect();
            if !implicit_components.is_empty() {
                info!(
                    "Having to activate dependent components: [{}]",
                    join(&implicit_components)
                );
                for component in &implicit_components {
                    selected.insert(component.clone(), Vec::new());
                }
            }
        }

        let order = order(&self.catalog, selected.keys());

        for component in ref_components.into_keys() {
            selected.entry(component).or_default();
        }
        let active_components: BTreeSet<ComponentName> = selected.keys().cloned().collect();

        info!(
            "Starting action [{}] on {} for distro [{}]",
            action,
            Utc::now().to_rfc2822(),
            distro
        );
        info!(
            "Will {} [{}] (in that order) using root directory \"{}\"",
            action,
            join(&order),
            root_dir.display()
        );

        let context = Arc::new(RunContext {
            active_components: active_components.clone(),
            distro: distro.clone(),
            packager,
            config: Arc::clone(&self.config),
            catalog: Arc::clone(&self.catalog),
            root: root_dir.clone(),
        });

        pre_run(action, &root_dir)?;
        let result = LifecycleRunner::new(&self.registry)
            .run(action, &order, &selected, force, context)
            .await?;
        for line in settings_report(&self.config, action) {
            info!("{}", line);
        }
        post_run(action, &root_dir)?;

        info!("Finished action [{}] on {}", action, Utc::now().to_rfc2822());
        let traces = result.trace_paths();
        if !traces.is_empty() {
            info!("Check [{}] for traces of what happened.", display_paths(&traces));
        }

        Ok(RunReport {
            action,
            distro,
            order,
            implicit_components,
            active_components,
            result,
        })
    }

    fn distro(&self) -> Result<Distro> {
        if let Some(distro) = &self.distro {
            return Ok(distro.clone());
        }
        match &self.distro_setting {
            Some(name) => Distro::from_name(name),
            None => Distro::detect(),
        }
    }
}

fn join<'a>(names: impl IntoIterator<Item = &'a ComponentName>) -> String {
    names
        .into_iter()
        .map(ComponentName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_root(action: Action, root: &Path) -> Result<()> {
    if root.as_os_str().is_empty() {
        return Err(Error::InvalidRootDir("empty path".to_string()));
    }

    if action == Action::Install && root.exists() {
        if !root.is_dir() {
            return Err(Error::InvalidRootDir(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        if std::fs::read_dir(root)?.next().is_some() {
            return Err(Error::RootDirNotEmpty(root.to_path_buf()));
        }
    }

    Ok(())
}

fn pre_run(action: Action, root: &Path) -> Result<()> {
    if action == Action::Install {
        std::fs::create_dir_all(root)?;
    }
    Ok(())
}

fn post_run(action: Action, root: &Path) -> Result<()> {
    if action == Action::Uninstall {
        match std::fs::remove_dir_all(root) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Lines describing the settings a run touched
///
/// Empty when no password, config value or data source name was handed out.
pub(crate) fn settings_report(config: &ConfigStore, action: Action) -> Vec<String> {
    let passwords = config.passwords();
    let password_prefix = format!("{}/", PASSWORD_SECTION);
    let configs: BTreeMap<String, String> = config
        .fetched()
        .into_iter()
        .filter(|(key, _)| !key.starts_with(&password_prefix))
        .collect();
    let dsns = config.dsns();

    if passwords.is_empty() && configs.is_empty() && dsns.is_empty() {
        return Vec::new();
    }

    let mut lines = vec![format!("After action ({}) your settings are:", action)];
    for (title, values) in [
        ("Passwords:", &passwords),
        ("Configs:", &configs),
        ("Data source names:", &dsns),
    ] {
        if values.is_empty() {
            continue;
        }
        lines.push(title.to_string());
        lines.extend(values.iter().map(|(k, v)| format!("\t{}={}", k, v)));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_check_root() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            check_root(Action::Install, Path::new("")),
            Err(Error::InvalidRootDir(_))
        ));
        assert!(check_root(Action::Install, temp.path()).is_ok());
        assert!(check_root(Action::Install, &temp.path().join("new")).is_ok());

        std::fs::write(temp.path().join("leftover"), "x").unwrap();
        assert!(matches!(
            check_root(Action::Install, temp.path()),
            Err(Error::RootDirNotEmpty(_))
        ));
        assert!(check_root(Action::Stop, temp.path()).is_ok());
        assert!(matches!(
            check_root(Action::Install, &temp.path().join("leftover")),
            Err(Error::InvalidRootDir(_))
        ));
    }

    #[test]
    fn test_settings_report_empty() {
        let store = ConfigStore::with_env(BTreeMap::new(), HashMap::new());
        assert!(settings_report(&store, Action::Install).is_empty());
    }

    #[test]
    fn test_settings_report() {
        let sections = BTreeMap::from([
            (
                "db".to_string(),
                BTreeMap::from([
                    ("host".to_string(), "localhost".to_string()),
                    ("user".to_string(), "root".to_string()),
                ]),
            ),
            (
                "passwords".to_string(),
                BTreeMap::from([("sql".to_string(), "pw".to_string())]),
            ),
        ]);
        let store = ConfigStore::with_env(sections, HashMap::new());
        store.get("passwords", "sql").unwrap();
        store.db_dsn("nova").unwrap();

        let lines = settings_report(&store, Action::Install);
        assert_eq!(
            lines,
            vec![
                "After action (install) your settings are:",
                "Passwords:",
                "\tsql=pw",
                "Configs:",
                "\tdb/host=localhost",
                "\tdb/user=root",
                "Data source names:",
                "\tnova=mysql://root:pw@localhost:3306/nova",
            ]
        );
    }
}
