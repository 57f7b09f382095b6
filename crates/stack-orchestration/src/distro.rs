//! Host distribution detection

use crate::packaging::{AptPackager, PackageManager, YumPackager};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const OS_RELEASE: &str = "/etc/os-release";

/// Package manager family of a distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackagerKind {
    /// Debian family, `apt-get` and `dpkg`
    Apt,
    /// Red Hat family, `yum`
    Yum,
}

impl PackagerKind {
    fn for_id(id: &str) -> Option<Self> {
        match id {
            "ubuntu" | "debian" => Some(PackagerKind::Apt),
            "rhel" | "centos" | "fedora" | "rocky" | "almalinux" => Some(PackagerKind::Yum),
            _ => None,
        }
    }
}

/// Supported host distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distro {
    /// Distribution id, e.g. `ubuntu`
    pub name: String,
    /// Version id when known
    pub version: Option<String>,
    /// Package manager family
    pub packager: PackagerKind,
}

impl Distro {
    /// Detect the distribution from `/etc/os-release`
    pub fn detect() -> Result<Self> {
        Self::detect_from(Path::new(OS_RELEASE))
    }

    /// Detect the distribution from an os-release file
    pub fn detect_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::UnsupportedPlatform(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_os_release(&content)
    }

    /// Parse os-release content
    ///
    /// `ID` is tried first, then each entry of `ID_LIKE`.
    pub fn from_os_release(content: &str) -> Result<Self> {
        let fields: HashMap<&str, String> = content
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim(), value.trim().trim_matches('"').to_string()))
            .collect();

        let id = fields.get("ID").map(|id| id.to_lowercase()).unwrap_or_default();
        let version = fields.get("VERSION_ID").cloned();
        let like = fields.get("ID_LIKE").map(|l| l.to_lowercase()).unwrap_or_default();

        let packager = std::iter::once(id.as_str())
            .chain(like.split_whitespace())
            .find_map(PackagerKind::for_id)
            .ok_or_else(|| {
                let platform = fields
                    .get("PRETTY_NAME")
                    .cloned()
                    .unwrap_or_else(|| id.clone());
                Error::UnsupportedPlatform(platform)
            })?;

        debug!("Detected distro {} ({:?})", id, packager);
        Ok(Self {
            name: id,
            version,
            packager,
        })
    }

    /// Distribution named explicitly, e.g. from the `settings.distro` override
    pub fn from_name(name: &str) -> Result<Self> {
        let (id, version) = match name.trim().split_once(char::is_whitespace) {
            Some((id, version)) => (id, Some(version.trim().to_string())),
            None => (name.trim(), None),
        };
        let id = id.to_lowercase();
        let packager =
            PackagerKind::for_id(&id).ok_or_else(|| Error::UnsupportedPlatform(name.to_string()))?;
        Ok(Self {
            name: id,
            version,
            packager,
        })
    }

    /// Package manager for this distribution
    pub fn package_manager(&self) -> Arc<dyn PackageManager> {
        match self.packager {
            PackagerKind::Apt => Arc::new(AptPackager::new()),
            PackagerKind::Yum => Arc::new(YumPackager::new()),
        }
    }
}

impl fmt::Display for Distro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} {}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_ubuntu_os_release() {
        let distro = Distro::from_os_release(
            "NAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\nID=ubuntu\nID_LIKE=debian\n",
        )
        .unwrap();
        assert_eq!(distro.name, "ubuntu");
        assert_eq!(distro.version.as_deref(), Some("22.04"));
        assert_eq!(distro.packager, PackagerKind::Apt);
        assert_eq!(distro.to_string(), "ubuntu 22.04");
    }

    #[test]
    fn test_id_like_fallback() {
        let distro = Distro::from_os_release(
            "ID=\"ol\"\nID_LIKE=\"fedora rhel\"\nVERSION_ID=\"8.9\"\n",
        )
        .unwrap();
        assert_eq!(distro.name, "ol");
        assert_eq!(distro.packager, PackagerKind::Yum);
    }

    #[test]
    fn test_unsupported_platform() {
        let err = Distro::from_os_release("ID=arch\nPRETTY_NAME=\"Arch Linux\"\n").unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform(p) if p == "Arch Linux"));
        assert!(Distro::from_os_release("").is_err());
    }

    #[test]
    fn test_from_name() {
        let distro = Distro::from_name("RHEL 6").unwrap();
        assert_eq!(distro.name, "rhel");
        assert_eq!(distro.version.as_deref(), Some("6"));
        assert_eq!(distro.packager, PackagerKind::Yum);
        assert_eq!(distro.package_manager().name(), "yum");
        assert!(Distro::from_name("gentoo").is_err());
    }

    #[test]
    fn test_detect_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ID=debian\nVERSION_ID=\"12\"").unwrap();
        let distro = Distro::detect_from(file.path()).unwrap();
        assert_eq!(distro.packager, PackagerKind::Apt);
        assert_eq!(distro.package_manager().name(), "apt");

        assert!(matches!(
            Distro::detect_from(Path::new("/nonexistent/os-release")),
            Err(Error::UnsupportedPlatform(_))
        ));
    }
}
