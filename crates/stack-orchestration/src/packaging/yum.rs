//! yum backend for Red Hat based distributions

use super::{Package, PackageError, PackageManager};
use async_trait::async_trait;
use command_executor::{Command, execute};
use std::path::Path;
use tracing::{debug, info};

/// Package manager driving `yum`
#[derive(Debug, Clone, Default)]
pub struct YumPackager;

impl YumPackager {
    /// Create the backend
    pub fn new() -> Self {
        Self
    }

    fn yum<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        Command::builder("yum").args(args).run_as_root().build()
    }

    fn versioned_name(package: &Package) -> String {
        match &package.version {
            Some(version) => format!("{}-{}", package.name, version),
            None => package.name.clone(),
        }
    }

    /// `yum install` command for a package
    pub fn install_command(&self, package: &Package) -> Command {
        self.yum(["install", "-y", "-t", Self::versioned_name(package).as_str()])
    }

    /// `yum install --nogpgcheck` command for a package's source rpm
    pub fn source_rpm_command(&self, package: &Package) -> Option<Command> {
        package
            .source_rpm
            .as_deref()
            .map(|rpm| self.yum(["install", "-y", "-t", "--nogpgcheck", rpm]))
    }

    /// `yum erase` commands for a package
    ///
    /// The package installed from the source rpm is erased first, then the
    /// package itself with its pinned version.
    pub fn erase_commands(&self, package: &Package) -> Vec<Command> {
        let mut commands = Vec::new();
        if let Some(rpm_package) = package.source_rpm.as_deref().and_then(rpm_package_name) {
            commands.push(self.yum(["erase", "-y", "-t", rpm_package.as_str()]));
        }
        commands.push(self.yum(["erase", "-y", "-t", Self::versioned_name(package).as_str()]));
        commands
    }
}

/// Package name of an rpm path or url: its file name without the extension
fn rpm_package_name(rpm: &str) -> Option<String> {
    Path::new(rpm)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

#[async_trait]
impl PackageManager for YumPackager {
    fn name(&self) -> &str {
        "yum"
    }

    async fn install(&self, package: &Package) -> Result<(), PackageError> {
        if let Some(command) = self.source_rpm_command(package) {
            let installed = match package.source_rpm.as_deref().and_then(rpm_package_name) {
                Some(name) => self.is_installed(&name).await?,
                None => false,
            };
            if installed {
                debug!("Rpm for {} already installed, skipping it", package.name);
            } else {
                info!("Installing rpm for {}", package.name);
                execute(&command).await?;
            }
        }

        info!("Installing package {}", package);
        execute(&self.install_command(package)).await?;
        Ok(())
    }

    async fn remove(&self, package: &Package) -> Result<bool, PackageError> {
        if !self.is_installed(&package.name).await? {
            debug!("Package {} is not installed, nothing to remove", package.name);
            return Ok(false);
        }

        info!("Removing package {}", package);
        for command in self.erase_commands(package) {
            execute(&command).await?;
        }
        Ok(true)
    }

    async fn is_installed(&self, name: &str) -> Result<bool, PackageError> {
        let command = Command::builder("yum")
            .args(["list", "installed", "-q", name])
            .ignore_exit_code()
            .build();
        let output = execute(&command).await?;
        Ok(output.status.success() && output.stderr.trim().is_empty())
    }
}
