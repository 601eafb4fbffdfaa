//! secret-injector - Materialize file-mounted secrets as environment variables
//!
//! Containers and orchestrators usually mount secrets as files
//! (`/run/secrets/db_password`), while many programs only read their
//! environment. This crate bridges the two: every `FOO_PATH=/some/file`
//! variable becomes `FOO=<trimmed contents of /some/file>`, then the real
//! command runs as a supervised child.
//!
//! A secret that can't be read never stops the child from starting. Only
//! usage errors and a child that fails to start or be waited on are fatal.

pub mod cli;
pub mod config;
pub mod error;
pub mod inject;
pub mod supervisor;

pub use cli::Cli;
pub use config::InjectorConfig;
pub use error::{InjectError, SetRejection, SupervisorError};
pub use inject::{inject, InjectionReport, SecretAssignment, SkipReason, PATH_SUFFIX};
pub use supervisor::Supervisor;
