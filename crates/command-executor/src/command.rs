//! Command type for building executable commands

use async_process::Command as AsyncCommand;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// A command to be executed
///
/// This is a builder for creating commands that can be converted to
/// `async_process::Command` when needed. Unlike `AsyncCommand`, this type is
/// `Clone` and can be rendered for logs and error messages.
#[derive(Debug, Clone)]
pub struct Command {
    program: OsString,
    args: Vec<OsString>,
    env: BTreeMap<OsString, OsString>,
    current_dir: Option<PathBuf>,
    run_as_root: bool,
    check_exit_code: bool,
}

impl Command {
    /// Create a new command for the given program
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            env: BTreeMap::new(),
            current_dir: None,
            run_as_root: false,
            check_exit_code: true,
        }
    }

    /// Create a builder for this command (for chaining)
    pub fn builder<S: AsRef<OsStr>>(program: S) -> CommandBuilder {
        CommandBuilder(Command::new(program))
    }

    /// Add an argument to the command
    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Add multiple arguments to the command
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.arg(arg);
        }
        self
    }

    /// Set an environment variable
    pub fn env<K, V>(&mut self, key: K, val: V) -> &mut Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.env
            .insert(key.as_ref().to_owned(), val.as_ref().to_owned());
        self
    }

    /// Set the working directory for the command
    pub fn current_dir<P: AsRef<Path>>(&mut self, dir: P) -> &mut Self {
        self.current_dir = Some(dir.as_ref().to_owned());
        self
    }

    /// Run the command through `sudo -n` unless the caller is already root
    pub fn run_as_root(&mut self, enabled: bool) -> &mut Self {
        self.run_as_root = enabled;
        self
    }

    /// Treat a non-zero exit code as an error (enabled by default)
    pub fn check_exit_code(&mut self, enabled: bool) -> &mut Self {
        self.check_exit_code = enabled;
        self
    }

    /// Get the program name
    pub fn get_program(&self) -> &OsStr {
        &self.program
    }

    /// Get the arguments
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Get the environment variables
    pub fn get_envs(&self) -> &BTreeMap<OsString, OsString> {
        &self.env
    }

    /// Get the current directory
    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Whether the command escalates privileges
    pub fn is_run_as_root(&self) -> bool {
        self.run_as_root
    }

    /// Whether a non-zero exit code is reported as an error
    pub fn is_exit_code_checked(&self) -> bool {
        self.check_exit_code
    }

    /// The full argument vector that will be executed, including any `sudo` prefix
    pub fn argv(&self) -> Vec<OsString> {
        let mut argv = Vec::with_capacity(self.args.len() + 3);
        if self.run_as_root && !nix::unistd::Uid::effective().is_root() {
            argv.push(OsString::from("sudo"));
            argv.push(OsString::from("-n"));
        }
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Render the command line for logs and error messages
    pub fn display(&self) -> String {
        self.argv()
            .iter()
            .map(|part| part.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Prepare this command for execution by converting to an `async_process::Command`
    pub fn prepare(&self) -> AsyncCommand {
        let argv = self.argv();
        let mut cmd = AsyncCommand::new(&argv[0]);
        cmd.args(&argv[1..]);

        for (key, val) in &self.env {
            cmd.env(key, val);
        }

        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        cmd
    }
}

/// Builder wrapper for more ergonomic command construction
pub struct CommandBuilder(Command);

impl CommandBuilder {
    /// Add an argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.0.arg(arg);
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.0.args(args);
        self
    }

    /// Set an environment variable
    pub fn env<K, V>(mut self, key: K, val: V) -> Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.0.env(key, val);
        self
    }

    /// Set the working directory
    pub fn current_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.0.current_dir(dir);
        self
    }

    /// Escalate privileges with `sudo -n`
    pub fn run_as_root(mut self) -> Self {
        self.0.run_as_root(true);
        self
    }

    /// Do not fail on a non-zero exit code
    pub fn ignore_exit_code(mut self) -> Self {
        self.0.check_exit_code(false);
        self
    }

    /// Build the command
    pub fn build(self) -> Command {
        self.0
    }
}
