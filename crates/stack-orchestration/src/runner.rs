//! Lifecycle runner driving each component through its hooks

use crate::action::{Action, Hook};
use crate::component::{ComponentName, ComponentOptions};
use crate::context::{HandlerArgs, RunContext};
use crate::handler::{HandlerRegistry, Trace};
use crate::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// What running a component produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentOutcome {
    /// The action left trace files
    Traced(Vec<PathBuf>),
    /// The action handled a number of items
    Counted(usize),
    /// The action finished without anything to report
    Completed,
    /// The component was skipped
    Skipped {
        /// Why it was skipped
        reason: String,
    },
}

/// Outcome for one component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentResult {
    /// Component
    pub component: ComponentName,
    /// Outcome
    pub outcome: ComponentOutcome,
}

/// Outcomes of a run in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Per component outcomes
    pub components: Vec<ComponentResult>,
}

impl RunResult {
    /// Trace paths of all components, in execution order
    pub fn trace_paths(&self) -> Vec<PathBuf> {
        self.components
            .iter()
            .filter_map(|result| match &result.outcome {
                ComponentOutcome::Traced(paths) => Some(paths.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Components that were skipped
    pub fn skipped(&self) -> impl Iterator<Item = &ComponentName> {
        self.components
            .iter()
            .filter(|result| matches!(result.outcome, ComponentOutcome::Skipped { .. }))
            .map(|result| &result.component)
    }
}

/// Runs an action over ordered components
///
/// Components are processed one at a time and each hook is awaited before
/// the next one starts. The first failure aborts the run, except a missing
/// trace during STOP or UNINSTALL when `force` is set: that component is
/// skipped and the run goes on.
pub struct LifecycleRunner<'a> {
    registry: &'a HandlerRegistry,
}

impl<'a> LifecycleRunner<'a> {
    /// Create a runner over the given registry
    pub fn new(registry: &'a HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Run `action` for every component of `order`
    pub async fn run(
        &self,
        action: Action,
        order: &[ComponentName],
        options: &ComponentOptions,
        force: bool,
        context: Arc<RunContext>,
    ) -> Result<RunResult> {
        let mut result = RunResult::default();

        for component in order {
            let args = HandlerArgs {
                component: component.clone(),
                options: options.get(component).cloned().unwrap_or_default(),
                context: Arc::clone(&context),
            };

            let outcome = match self.run_component(action, args).await {
                Ok(outcome) => outcome,
                Err(Error::Hook {
                    component,
                    hook,
                    source,
                }) if force && action.tolerates_missing_trace() && source.is_no_trace() => {
                    info!(
                        "Passing on {} of {} since no trace file was found ({}).",
                        hook, component, source
                    );
                    ComponentOutcome::Skipped {
                        reason: source.to_string(),
                    }
                }
                Err(e) => return Err(e),
            };

            result.components.push(ComponentResult {
                component: component.clone(),
                outcome,
            });
        }

        Ok(result)
    }

    async fn run_component(&self, action: Action, args: HandlerArgs) -> Result<ComponentOutcome> {
        let component = args.component.clone();
        let mut handler = self.registry.build(action, args)?;
        let mut captured = Trace::None;

        for &hook in action.hooks() {
            info!("{} {}.", hook.progress(), component);
            let trace = handler
                .invoke(hook)
                .await
                .map_err(|source| Error::Hook {
                    component: component.clone(),
                    hook,
                    source,
                })?;
            log_hook_result(&component, hook, &trace);

            if action.trace_hook() == Some(hook) {
                captured = trace;
            }
        }

        let outcome = match captured {
            Trace::Paths(paths) => {
                info!(
                    "Finished {} of {} - check {} for traces of what happened.",
                    action,
                    component,
                    display_paths(&paths)
                );
                ComponentOutcome::Traced(paths)
            }
            Trace::Count(count) => {
                info!("Finished {} of {} ({} items).", action, component, count);
                ComponentOutcome::Counted(count)
            }
            Trace::None => {
                info!("Finished {} of {}.", action, component);
                ComponentOutcome::Completed
            }
        };

        Ok(outcome)
    }
}

fn log_hook_result(component: &ComponentName, hook: Hook, trace: &Trace) {
    match (hook, trace) {
        (Hook::Download, Trace::Count(n)) => info!("Performed {} downloads.", n),
        (Hook::Configure, Trace::Count(n)) => info!("Configured {} items.", n),
        (Hook::Start, Trace::Count(n)) => info!("Started {} applications.", n),
        (Hook::Stop, Trace::Count(n)) => info!("Stopped {} items.", n),
        (Hook::Unconfigure, Trace::Count(n)) => info!("Unconfigured {} items.", n),
        _ => debug!("{} of {} returned {:?}", hook, component, trace),
    }
}

/// Join paths for log lines
pub(crate) fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
