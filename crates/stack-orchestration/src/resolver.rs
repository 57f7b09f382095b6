//! Dependency resolution over the catalog

use crate::component::{Catalog, ComponentName};
use std::collections::BTreeSet;

/// Transitive closure of `selected` over the catalog's dependency relation
///
/// With `ignore_deps` the selection is returned unchanged. Dependencies
/// missing from the catalog are included as opaque names and have no
/// dependencies of their own.
pub fn resolve<'a, I>(catalog: &Catalog, selected: I, ignore_deps: bool) -> BTreeSet<ComponentName>
where
    I: IntoIterator<Item = &'a ComponentName>,
{
    let mut resolved: BTreeSet<ComponentName> = selected.into_iter().cloned().collect();
    if ignore_deps {
        return resolved;
    }

    let mut pending: Vec<ComponentName> = resolved.iter().cloned().collect();
    while let Some(component) = pending.pop() {
        for dep in catalog.dependencies(component.as_str()) {
            if resolved.insert(dep.clone()) {
                pending.push(dep.clone());
            }
        }
    }

    resolved
}
