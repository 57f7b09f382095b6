//! Actions and the lifecycle hooks each one runs

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle action applied to a set of components
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Download, configure and install
    Install,
    /// Unconfigure and uninstall
    Uninstall,
    /// Start installed components
    Start,
    /// Stop started components
    Stop,
}

const INSTALL_HOOKS: &[Hook] = &[
    Hook::Download,
    Hook::Configure,
    Hook::PreInstall,
    Hook::Install,
    Hook::PostInstall,
];
const START_HOOKS: &[Hook] = &[Hook::PreStart, Hook::Start, Hook::PostStart];
const STOP_HOOKS: &[Hook] = &[Hook::Stop];
const UNINSTALL_HOOKS: &[Hook] = &[Hook::Unconfigure, Hook::Uninstall];

impl Action {
    /// All actions
    pub const ALL: [Action; 4] = [Action::Install, Action::Uninstall, Action::Start, Action::Stop];

    /// Lowercase action name
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Install => "install",
            Action::Uninstall => "uninstall",
            Action::Start => "start",
            Action::Stop => "stop",
        }
    }

    /// Banner shown when a run starts
    pub fn banner(&self) -> &'static str {
        match self {
            Action::Install => "INSTALLER",
            Action::Uninstall => "UNINSTALLER",
            Action::Start => "STARTER",
            Action::Stop => "STOPPER",
        }
    }

    /// Hooks run for every component, in order
    pub fn hooks(&self) -> &'static [Hook] {
        match self {
            Action::Install => INSTALL_HOOKS,
            Action::Start => START_HOOKS,
            Action::Stop => STOP_HOOKS,
            Action::Uninstall => UNINSTALL_HOOKS,
        }
    }

    /// Hook whose trace is collected into the run result
    pub fn trace_hook(&self) -> Option<Hook> {
        match self {
            Action::Install => Some(Hook::PostInstall),
            Action::Start => Some(Hook::Start),
            Action::Stop | Action::Uninstall => None,
        }
    }

    /// Whether a missing trace can be skipped under `force`
    pub fn tolerates_missing_trace(&self) -> bool {
        matches!(self, Action::Stop | Action::Uninstall)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s.trim().to_lowercase();
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == cleaned)
            .ok_or_else(|| Error::InvalidAction(s.to_string()))
    }
}

/// A single lifecycle hook of a component handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    /// Fetch sources
    Download,
    /// Render configuration
    Configure,
    /// Prepare for installation
    PreInstall,
    /// Install packages
    Install,
    /// Finish installation, produces the install trace
    PostInstall,
    /// Prepare for start
    PreStart,
    /// Start processes, produces the start trace
    Start,
    /// Finish start
    PostStart,
    /// Stop processes
    Stop,
    /// Remove configuration
    Unconfigure,
    /// Remove packages
    Uninstall,
}

impl Hook {
    /// Hook name as used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::Download => "download",
            Hook::Configure => "configure",
            Hook::PreInstall => "pre_install",
            Hook::Install => "install",
            Hook::PostInstall => "post_install",
            Hook::PreStart => "pre_start",
            Hook::Start => "start",
            Hook::PostStart => "post_start",
            Hook::Stop => "stop",
            Hook::Unconfigure => "unconfigure",
            Hook::Uninstall => "uninstall",
        }
    }

    /// Progress verb logged before the hook runs
    pub fn progress(&self) -> &'static str {
        match self {
            Hook::Download => "Downloading",
            Hook::Configure => "Configuring",
            Hook::PreInstall => "Pre-installing",
            Hook::Install => "Installing",
            Hook::PostInstall => "Post-installing",
            Hook::PreStart => "Pre-starting",
            Hook::Start => "Starting",
            Hook::PostStart => "Post-starting",
            Hook::Stop => "Stopping",
            Hook::Unconfigure => "Unconfiguring",
            Hook::Uninstall => "Uninstalling",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        assert_eq!("install".parse::<Action>().unwrap(), Action::Install);
        assert_eq!("  STOP \n".parse::<Action>().unwrap(), Action::Stop);
        assert_eq!("Start".parse::<Action>().unwrap(), Action::Start);
        assert_eq!("uninstall".parse::<Action>().unwrap(), Action::Uninstall);
    }

    #[test]
    fn test_parse_invalid_action() {
        assert!(matches!(
            "restart".parse::<Action>(),
            Err(Error::InvalidAction(a)) if a == "restart"
        ));
        assert!("".parse::<Action>().is_err());
    }

    #[test]
    fn test_hook_sequences() {
        assert_eq!(
            Action::Install.hooks(),
            &[
                Hook::Download,
                Hook::Configure,
                Hook::PreInstall,
                Hook::Install,
                Hook::PostInstall
            ]
        );
        assert_eq!(
            Action::Start.hooks(),
            &[Hook::PreStart, Hook::Start, Hook::PostStart]
        );
        assert_eq!(Action::Stop.hooks(), &[Hook::Stop]);
        assert_eq!(
            Action::Uninstall.hooks(),
            &[Hook::Unconfigure, Hook::Uninstall]
        );
    }

    #[test]
    fn test_trace_hook_is_part_of_sequence() {
        for action in Action::ALL {
            if let Some(hook) = action.trace_hook() {
                assert!(action.hooks().contains(&hook));
            }
        }
        assert!(Action::Stop.tolerates_missing_trace());
        assert!(Action::Uninstall.tolerates_missing_trace());
        assert!(!Action::Install.tolerates_missing_trace());
        assert!(!Action::Start.tolerates_missing_trace());
    }
}
