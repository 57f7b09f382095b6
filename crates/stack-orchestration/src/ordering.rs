//! Priority ordering of resolved components

use crate::component::{Catalog, ComponentName};
use std::collections::BTreeSet;

/// Order components by ascending priority, ties broken by name
///
/// Each component appears exactly once. Components missing from the catalog
/// sort first so a run reaches them before anything that depends on them.
/// The order respects dependencies only because the catalog guarantees
/// dependencies have lower priorities.
pub fn order<'a, I>(catalog: &Catalog, components: I) -> Vec<ComponentName>
where
    I: IntoIterator<Item = &'a ComponentName>,
{
    let unique: BTreeSet<&ComponentName> = components.into_iter().collect();
    let mut ordered: Vec<ComponentName> = unique.into_iter().cloned().collect();
    ordered.sort_by_key(|name| catalog.priority(name.as_str()));
    ordered
}
