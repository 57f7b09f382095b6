//! Configuration driven component handlers
//!
//! Every catalog component gets the same three handlers. What they do comes
//! from the component's definition in `stack.yaml`: the packages to install,
//! the config files to render, the sources to check out and the processes to
//! launch. Everything created is recorded in the component's trace files so
//! the matching teardown action can undo it.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<component>/app/<download>     source checkouts
//! <root>/<component>/config/<file>      rendered config files
//! <root>/<component>/logs/<process>.log process output
//! <root>/<component>/traces/*.trace     install and start traces
//! ```

use crate::component::{Catalog, ComponentName};
use crate::context::{HandlerArgs, RunContext};
use crate::handler::{HandlerRegistry, HookError, HookResult, Installer, Runtime, Trace, Uninstaller};
use crate::packaging::Package;
use crate::trace::{EntryKind, INSTALL_TRACE, START_TRACE, TraceReader, TraceWriter, trace_path};
use async_trait::async_trait;
use command_executor::{Command, execute, spawn_detached, terminate};
use serde_json::json;
use stack_config::{ComponentDef, ProcessDef};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Register the generic handlers for every catalog component
pub fn register(registry: &mut HandlerRegistry, catalog: &Catalog) {
    for spec in catalog.iter() {
        registry.register_installer(spec.name.clone(), |args| {
            Ok(Box::new(GenericInstaller::new(args)?) as Box<dyn Installer>)
        });
        registry.register_runtime(spec.name.clone(), |args| {
            Ok(Box::new(GenericRuntime::new(args)?) as Box<dyn Runtime>)
        });
        registry.register_uninstaller(spec.name.clone(), |args| {
            Ok(Box::new(GenericUninstaller::new(args)?) as Box<dyn Uninstaller>)
        });
    }
}

/// Directories and definition of one component
#[derive(Debug, Clone)]
struct ComponentDirs {
    component: ComponentName,
    options: Vec<String>,
    definition: ComponentDef,
    context: Arc<RunContext>,
    dir: PathBuf,
}

impl ComponentDirs {
    fn new(args: HandlerArgs) -> HookResult<Self> {
        let definition = args
            .context
            .catalog
            .get(args.component.as_str())
            .map(|spec| spec.definition.clone())
            .ok_or_else(|| {
                HookError::failed(format!("Component {} is not in the catalog", args.component))
            })?;

        Ok(Self {
            dir: args.context.component_dir(&args.component),
            component: args.component,
            options: args.options,
            definition,
            context: args.context,
        })
    }

    fn app_dir(&self) -> PathBuf {
        self.dir.join("app")
    }

    fn config_dir(&self) -> PathBuf {
        self.dir.join("config")
    }

    fn log_dir(&self) -> PathBuf {
        self.dir.join("logs")
    }

    fn install_trace(&self) -> PathBuf {
        trace_path(&self.dir, INSTALL_TRACE)
    }

    fn start_trace(&self) -> PathBuf {
        trace_path(&self.dir, START_TRACE)
    }

    fn read_trace(&self, path: PathBuf) -> HookResult<TraceReader> {
        match TraceReader::open(&path)? {
            Some(reader) => Ok(reader),
            None => Err(HookError::no_trace(&self.component, path)),
        }
    }
}

/// Create `dir` and its missing parents, tracing each one created
fn ensure_dir(dir: &Path, trace: &TraceWriter) -> io::Result<()> {
    let missing: Vec<&Path> = dir.ancestors().take_while(|d| !d.exists()).collect();
    for created in missing.into_iter().rev() {
        std::fs::create_dir(created)?;
        trace.dir_created(created)?;
    }
    Ok(())
}

/// Remove the directories a trace recorded, newest first
///
/// Directories that were already there before the install are left alone.
fn remove_created_dirs(reader: &TraceReader) -> io::Result<usize> {
    let mut removed = 0;
    for dir in reader.dirs_created().iter().rev() {
        match std::fs::remove_dir_all(dir) {
            Ok(()) => {
                debug!("Removed {}", dir.display());
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}

fn remove_file_if_present(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Installs packages, sources and config files of a component
pub struct GenericInstaller {
    dirs: ComponentDirs,
    trace: TraceWriter,
}

impl GenericInstaller {
    /// Build the installer
    pub fn new(args: HandlerArgs) -> HookResult<Self> {
        let dirs = ComponentDirs::new(args)?;
        let trace = TraceWriter::new(dirs.install_trace())?;
        Ok(Self { dirs, trace })
    }
}

#[async_trait]
impl Installer for GenericInstaller {
    async fn download(&mut self) -> HookResult<usize> {
        let mut downloaded = 0;
        for download in &self.dirs.definition.downloads {
            let target = self.dirs.app_dir().join(&download.name);
            if target.exists() {
                debug!("{} already present at {}", download.name, target.display());
                continue;
            }
            ensure_dir(&self.dirs.app_dir(), &self.trace)?;

            let mut command = Command::new("git");
            command.arg("clone");
            if let Some(branch) = &download.branch {
                command.args(["-b", branch.as_str()]);
            }
            command.arg(&download.repo).arg(&target);

            info!("Downloading {} into {}", download.repo, target.display());
            execute(&command).await?;
            self.trace.record(
                EntryKind::Download,
                json!({ "repo": download.repo, "target": target }),
            )?;
            downloaded += 1;
        }
        Ok(downloaded)
    }

    async fn configure(&mut self) -> HookResult<usize> {
        let config_dir = self.dirs.config_dir();
        let mut written = 0;
        for (name, template) in &self.dirs.definition.config_files {
            let contents = self.dirs.context.config.render(template)?;
            let path = config_dir.join(name);
            if let Some(parent) = path.parent() {
                ensure_dir(parent, &self.trace)?;
            }

            debug!("Writing {}", path.display());
            std::fs::write(&path, contents)?;
            self.trace.file_written(&path)?;
            written += 1;
        }
        Ok(written)
    }

    async fn pre_install(&mut self) -> HookResult<()> {
        for dir in [
            self.dirs.dir.clone(),
            self.dirs.app_dir(),
            self.dirs.config_dir(),
            self.dirs.log_dir(),
        ] {
            ensure_dir(&dir, &self.trace)?;
        }
        Ok(())
    }

    async fn install(&mut self) -> HookResult<()> {
        let packager = &self.dirs.context.packager;
        for def in &self.dirs.definition.packages {
            let package = Package::from(def);
            if packager.is_installed(&package.name).await? {
                info!("Package {} already installed, leaving it alone", package.name);
                continue;
            }

            packager.install(&package).await?;
            self.trace.package_installed(&package)?;
        }
        Ok(())
    }

    async fn post_install(&mut self) -> HookResult<Trace> {
        Ok(Trace::Paths(vec![self.trace.path().to_path_buf()]))
    }
}

/// Starts and stops the processes of a component
pub struct GenericRuntime {
    dirs: ComponentDirs,
}

impl GenericRuntime {
    /// Build the runtime
    pub fn new(args: HandlerArgs) -> HookResult<Self> {
        Ok(Self {
            dirs: ComponentDirs::new(args)?,
        })
    }

    /// Processes selected by the options, all of them when there are none
    fn selected_processes(&self) -> Vec<&ProcessDef> {
        let processes = &self.dirs.definition.processes;
        if self.dirs.options.is_empty() {
            return processes.iter().collect();
        }

        for option in &self.dirs.options {
            if !processes.iter().any(|p| &p.name == option) {
                warn!("{} has no process named {}", self.dirs.component, option);
            }
        }
        processes
            .iter()
            .filter(|p| self.dirs.options.contains(&p.name))
            .collect()
    }

    fn command_for(&self, process: &ProcessDef) -> HookResult<Command> {
        let config = &self.dirs.context.config;
        let mut command = Command::new(config.render(&process.command)?);
        for arg in &process.args {
            command.arg(config.render(arg)?);
        }
        for (key, value) in &process.env {
            command.env(key, config.render(value)?);
        }
        let working_dir = match &process.working_dir {
            Some(dir) => self.dirs.dir.join(config.render(dir)?),
            None => self.dirs.app_dir(),
        };
        command.current_dir(working_dir);
        Ok(command)
    }
}

#[async_trait]
impl Runtime for GenericRuntime {
    async fn pre_start(&mut self) -> HookResult<()> {
        let install_trace = self.dirs.install_trace();
        if !install_trace.exists() {
            return Err(HookError::no_trace(&self.dirs.component, install_trace));
        }
        Ok(())
    }

    async fn start(&mut self) -> HookResult<Trace> {
        let processes = self.selected_processes();
        if processes.is_empty() {
            return Ok(Trace::Count(0));
        }

        let trace = TraceWriter::new(self.dirs.start_trace())?;
        std::fs::create_dir_all(self.dirs.log_dir())?;
        for process in processes {
            let command = self.command_for(process)?;
            let log_file = self.dirs.log_dir().join(format!("{}.log", process.name));
            let pid = spawn_detached(&command, &log_file)?;
            info!("Started {} ({}) as pid {}", process.name, self.dirs.component, pid);
            trace.record(EntryKind::Pid, pid)?;
            trace.record(EntryKind::LogFile, &log_file)?;
        }

        Ok(Trace::Paths(vec![trace.path().to_path_buf()]))
    }

    async fn stop(&mut self) -> HookResult<usize> {
        if self.selected_processes().is_empty() {
            debug!("{} has no processes to stop", self.dirs.component);
            return Ok(0);
        }

        let reader = self.dirs.read_trace(self.dirs.start_trace())?;
        let mut stopped = 0;
        for pid in reader.pids() {
            if terminate(pid)? {
                stopped += 1;
            } else {
                debug!("Process {} of {} already gone", pid, self.dirs.component);
            }
        }
        remove_file_if_present(reader.path())?;
        Ok(stopped)
    }
}

/// Removes what the installer recorded
pub struct GenericUninstaller {
    dirs: ComponentDirs,
}

impl GenericUninstaller {
    /// Build the uninstaller
    pub fn new(args: HandlerArgs) -> HookResult<Self> {
        Ok(Self {
            dirs: ComponentDirs::new(args)?,
        })
    }
}

#[async_trait]
impl Uninstaller for GenericUninstaller {
    async fn unconfigure(&mut self) -> HookResult<usize> {
        let reader = self.dirs.read_trace(self.dirs.install_trace())?;
        let mut removed = 0;
        for file in reader.files_written() {
            if remove_file_if_present(&file)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn uninstall(&mut self) -> HookResult<()> {
        let reader = self.dirs.read_trace(self.dirs.install_trace())?;
        for package in reader.packages_installed().iter().rev() {
            if !self.dirs.context.packager.remove(package).await? {
                debug!("Package {} was already removed", package.name);
            }
        }

        let removed = remove_created_dirs(&reader)?;
        debug!("Removed {} directories of {}", removed, self.dirs.component);
        Ok(())
    }
}
