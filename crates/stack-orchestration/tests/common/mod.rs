//! Shared fixtures for orchestration tests

#![allow(dead_code)]

use async_trait::async_trait;
use stack_config::ConfigStore;
use stack_orchestration::{
    Catalog, Distro, HandlerRegistry, Package, PackageError, PackageManager, RunCoordinator,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

/// Package manager that only records what it was asked to do
#[derive(Debug, Default)]
pub struct FakePackager {
    installed: Mutex<BTreeSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakePackager {
    pub fn with_installed(names: &[&str]) -> Self {
        let packager = Self::default();
        packager
            .installed
            .lock()
            .unwrap()
            .extend(names.iter().map(|n| n.to_string()));
        packager
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn installed(&self) -> BTreeSet<String> {
        self.installed.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageManager for FakePackager {
    fn name(&self) -> &str {
        "fake"
    }

    async fn install(&self, package: &Package) -> Result<(), PackageError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("install {}", package.name));
        self.installed.lock().unwrap().insert(package.name.clone());
        Ok(())
    }

    async fn remove(&self, package: &Package) -> Result<bool, PackageError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("remove {}", package.name));
        Ok(self.installed.lock().unwrap().remove(&package.name))
    }

    async fn is_installed(&self, name: &str) -> Result<bool, PackageError> {
        Ok(self.installed.lock().unwrap().contains(name))
    }
}

/// Config store that does not read the process environment
pub fn store(sections: BTreeMap<String, BTreeMap<String, String>>) -> Arc<ConfigStore> {
    Arc::new(ConfigStore::with_env(sections, HashMap::new()))
}

/// Coordinator pinned to ubuntu with the given package manager
pub fn coordinator(
    catalog: Catalog,
    registry: HandlerRegistry,
    packager: Arc<FakePackager>,
) -> RunCoordinator {
    RunCoordinator::with_store(Arc::new(catalog), registry, store(BTreeMap::new()))
        .with_distro(Distro::from_name("ubuntu").unwrap())
        .with_packager(packager)
}
