//! apt-get backend for Debian based distributions

use super::{Package, PackageError, PackageManager};
use async_trait::async_trait;
use command_executor::{Command, execute};
use tracing::{debug, info};

/// Package manager driving `apt-get` and `dpkg`
#[derive(Debug, Clone, Default)]
pub struct AptPackager;

impl AptPackager {
    /// Create the backend
    pub fn new() -> Self {
        Self
    }

    fn apt_get(&self, subcommand: &str, target: &str) -> Command {
        Command::builder("apt-get")
            .args(["-y", "-q", subcommand, target])
            .env("DEBIAN_FRONTEND", "noninteractive")
            .run_as_root()
            .build()
    }

    /// `apt-get install` command for a package
    pub fn install_command(&self, package: &Package) -> Command {
        let target = match &package.version {
            Some(version) => format!("{}={}", package.name, version),
            None => package.name.clone(),
        };
        self.apt_get("install", &target)
    }

    /// `apt-get remove` and optional `apt-get purge` commands for a package
    pub fn remove_commands(&self, package: &Package) -> Vec<Command> {
        let mut commands = vec![self.apt_get("remove", &package.name)];
        if package.purge {
            commands.push(self.apt_get("purge", &package.name));
        }
        commands
    }
}

#[async_trait]
impl PackageManager for AptPackager {
    fn name(&self) -> &str {
        "apt"
    }

    async fn install(&self, package: &Package) -> Result<(), PackageError> {
        info!("Installing package {}", package);
        execute(&self.install_command(package)).await?;
        Ok(())
    }

    async fn remove(&self, package: &Package) -> Result<bool, PackageError> {
        if !self.is_installed(&package.name).await? {
            debug!("Package {} is not installed, nothing to remove", package.name);
            return Ok(false);
        }

        info!("Removing package {}", package.name);
        for command in self.remove_commands(package) {
            execute(&command).await?;
        }
        Ok(true)
    }

    async fn is_installed(&self, name: &str) -> Result<bool, PackageError> {
        let command = Command::builder("dpkg")
            .args(["-s", name])
            .ignore_exit_code()
            .build();
        let output = execute(&command).await?;
        Ok(output.status.success())
    }
}
