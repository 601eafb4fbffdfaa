//! Error types for secret injection and child supervision

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Per-secret failures. These are recovered locally and never abort a pass.
#[derive(Error, Debug)]
pub enum InjectError {
    #[error("Failed to read {source_var} from {path:?}")]
    Read {
        source_var: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to set {target:?}: {reason}")]
    Set { target: OsString, reason: SetRejection },
}

/// Why the environment would refuse a variable
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetRejection {
    #[error("Empty variable name")]
    EmptyName,

    #[error("Variable name contains '='")]
    NameContainsEquals,

    #[error("Variable name contains a NUL byte")]
    NameContainsNul,

    #[error("Value contains a NUL byte")]
    ValueContainsNul,
}

/// Fatal child-process lifecycle failures
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("No command specified, use -- to separate options from the command")]
    EmptyCommand,

    #[error("Failed to install signal handlers")]
    Signals(#[source] io::Error),

    #[error("Failed to start {program:?}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to wait on child process")]
    Wait(#[source] io::Error),
}
