//! Local command execution library
//!
//! This crate provides the process primitives the stack orchestrator needs on
//! the target host: running a command to completion with captured output,
//! starting a detached background process whose output goes to a log file,
//! and signalling a previously started process by pid.

#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod process;

pub use command::Command;
pub use error::{Error, Result};
pub use process::{ExitStatus, Output, execute, spawn_detached, terminate};
