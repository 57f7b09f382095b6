use anyhow::{Context, Result};
use stack_config::Config;
use stack_orchestration::{
    Catalog, ComponentOptions, HandlerRegistry, RunCoordinator, RunRequest, parse_component_list,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments of `stack run`
pub struct RunArgs {
    pub action: String,
    pub components: Vec<String>,
    pub dir: PathBuf,
    pub ignore_deps: bool,
    pub ref_components: Vec<String>,
    pub force: bool,
}

/// Merge every `--components` occurrence into one option map
pub fn parse_lists(lists: &[String]) -> Result<ComponentOptions> {
    let mut merged = ComponentOptions::new();
    for list in lists {
        for (component, options) in parse_component_list(list)? {
            merged.entry(component).or_default().extend(options);
        }
    }
    Ok(merged)
}

pub async fn run(config: &Config, args: RunArgs) -> Result<bool> {
    let catalog = Arc::new(Catalog::from_config(config).context("Invalid component catalog")?);
    let registry = HandlerRegistry::from_catalog(&catalog);
    let coordinator = RunCoordinator::new(catalog, registry, config);

    let request = RunRequest::new(args.action, args.dir)
        .with_components(parse_lists(&args.components)?)
        .with_ref_components(parse_lists(&args.ref_components)?)
        .ignore_deps(args.ignore_deps)
        .force(args.force);

    Ok(coordinator.run_action(request).await)
}
