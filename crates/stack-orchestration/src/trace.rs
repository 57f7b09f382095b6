//! Trace files recording what a component did
//!
//! A trace file is a list of JSON lines under
//! `<root>/<component>/traces/<name>.trace`. Installation records the
//! packages, directories and files it created so uninstall can undo them;
//! start records the pids and log files of launched processes so stop can
//! find them.

use crate::packaging::Package;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Trace written while installing
pub const INSTALL_TRACE: &str = "install";

/// Trace written while starting
pub const START_TRACE: &str = "start";

const TRACE_DIR: &str = "traces";

/// Location of a named trace inside a component directory
pub fn trace_path(component_dir: &Path, name: &str) -> PathBuf {
    component_dir.join(TRACE_DIR).join(format!("{}.trace", name))
}

/// What a trace entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A package was installed
    PackageInstalled,
    /// A directory was created
    DirCreated,
    /// A config file was written
    FileWritten,
    /// A source checkout was fetched
    Download,
    /// A process was started
    Pid,
    /// A process log file
    LogFile,
}

/// One line of a trace file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
    /// What was recorded
    pub kind: EntryKind,
    /// Recorded value
    pub value: Value,
}

/// Appends entries to a trace file
#[derive(Debug, Clone)]
pub struct TraceWriter {
    path: PathBuf,
}

impl TraceWriter {
    /// Open a trace for appending, creating its directory
    pub fn new(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Trace file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry
    pub fn record(&self, kind: EntryKind, value: impl Serialize) -> io::Result<()> {
        let entry = TraceEntry {
            timestamp: Utc::now(),
            kind,
            value: serde_json::to_value(value)?,
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }

    /// Record an installed package
    pub fn package_installed(&self, package: &Package) -> io::Result<()> {
        self.record(EntryKind::PackageInstalled, package)
    }

    /// Record a created directory
    pub fn dir_created(&self, dir: &Path) -> io::Result<()> {
        self.record(EntryKind::DirCreated, dir)
    }

    /// Record a written file
    pub fn file_written(&self, file: &Path) -> io::Result<()> {
        self.record(EntryKind::FileWritten, file)
    }
}

/// Parsed trace file
#[derive(Debug, Clone)]
pub struct TraceReader {
    path: PathBuf,
    entries: Vec<TraceEntry>,
}

impl TraceReader {
    /// Read a trace file, `None` when it does not exist
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Option<Self>> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let entries = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("corrupt trace {}: {}", path.display(), e),
                    )
                })
            })
            .collect::<io::Result<Vec<TraceEntry>>>()?;

        Ok(Some(Self { path, entries }))
    }

    /// Trace file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries in recording order
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    fn values<T: serde::de::DeserializeOwned>(&self, kind: EntryKind) -> Vec<T> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .filter_map(|entry| serde_json::from_value(entry.value.clone()).ok())
            .collect()
    }

    /// Installed packages in recording order
    pub fn packages_installed(&self) -> Vec<Package> {
        self.values(EntryKind::PackageInstalled)
    }

    /// Created directories in recording order
    pub fn dirs_created(&self) -> Vec<PathBuf> {
        self.values(EntryKind::DirCreated)
    }

    /// Written files in recording order
    pub fn files_written(&self) -> Vec<PathBuf> {
        self.values(EntryKind::FileWritten)
    }

    /// Started process ids
    pub fn pids(&self) -> Vec<u32> {
        self.values(EntryKind::Pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_trace_path() {
        assert_eq!(
            trace_path(Path::new("/opt/stack/db"), INSTALL_TRACE),
            PathBuf::from("/opt/stack/db/traces/install.trace")
        );
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let path = trace_path(temp.path(), INSTALL_TRACE);
        let writer = TraceWriter::new(&path).unwrap();

        writer
            .package_installed(&Package::new("mysql-server").with_version("5.1"))
            .unwrap();
        writer.dir_created(Path::new("/opt/stack/db")).unwrap();
        writer.file_written(Path::new("/opt/stack/db/config/my.cnf")).unwrap();
        writer.package_installed(&Package::new("mysql-client")).unwrap();

        let reader = TraceReader::open(&path).unwrap().unwrap();
        assert_eq!(reader.entries().len(), 4);
        assert_eq!(
            reader
                .packages_installed()
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>(),
            vec!["mysql-server", "mysql-client"]
        );
        assert_eq!(reader.dirs_created(), vec![PathBuf::from("/opt/stack/db")]);
        assert_eq!(
            reader.files_written(),
            vec![PathBuf::from("/opt/stack/db/config/my.cnf")]
        );
        assert!(reader.pids().is_empty());
    }

    #[test]
    fn test_missing_trace() {
        let temp = TempDir::new().unwrap();
        assert!(
            TraceReader::open(trace_path(temp.path(), START_TRACE))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_corrupt_trace() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.trace");
        fs::write(&path, "not json\n").unwrap();
        let err = TraceReader::open(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
