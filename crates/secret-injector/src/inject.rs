//! Secret injection - turn `*_PATH` variables into plain variables
//!
//! For every environment variable whose name ends in `_PATH`, the file it
//! points to is read, trimmed, and exported under the name without the
//! suffix. `DB_SECRET_PATH=/run/secrets/db` becomes `DB_SECRET=<contents>`.
//!
//! Scanning is split from writing so the scan can run over any list of
//! variables. Only [`apply`] and [`inject`] touch the process environment.

use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{InjectError, SetRejection};

/// Suffix marking a variable as a pointer to a secret file
pub const PATH_SUFFIX: &str = "_PATH";

/// A secret read from disk, ready to be exported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretAssignment {
    /// The `*_PATH` variable this came from
    pub source: OsString,
    /// Variable to set (source without the suffix)
    pub target: OsString,
    /// File the value was read from
    pub path: PathBuf,
    /// Trimmed file contents
    pub value: String,
}

/// Why a `*_PATH` variable produced no secret
#[derive(Debug)]
pub enum SkipReason {
    EmptyPath,
    Failed(InjectError),
}

#[derive(Debug)]
pub struct Skipped {
    pub source: OsString,
    pub reason: SkipReason,
}

/// Result of scanning the environment, before anything is written
#[derive(Debug, Default)]
pub struct SecretPlan {
    pub assignments: Vec<SecretAssignment>,
    pub skipped: Vec<Skipped>,
}

/// Outcome of one injection pass
#[derive(Debug, Default)]
pub struct InjectionReport {
    /// Target names that were set, in enumeration order
    pub injected: Vec<OsString>,
    pub skipped: Vec<Skipped>,
}

impl InjectionReport {
    pub fn injected_count(&self) -> usize {
        self.injected.len()
    }
}

/// Strip exactly one trailing `_PATH`. Returns `None` if the name doesn't end with it.
///
/// A variable named just `_PATH` maps to an empty target name.
pub fn target_name(name: &OsStr) -> Option<OsString> {
    name.as_bytes()
        .strip_suffix(PATH_SUFFIX.as_bytes())
        .map(|stem| OsString::from_vec(stem.to_vec()))
}

/// Read a secret file and trim surrounding Unicode whitespace
pub fn read_secret(path: &Path) -> io::Result<String> {
    let contents = fs::read_to_string(path)?;
    Ok(contents.trim().to_string())
}

/// Scan `vars` for `*_PATH` entries and read every secret they point to.
///
/// Read failures are recorded in [`SecretPlan::skipped`]; they never stop the scan.
pub fn plan_secrets<I>(vars: I) -> SecretPlan
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut plan = SecretPlan::default();

    for (name, value) in vars {
        let Some(target) = target_name(&name) else {
            continue;
        };

        if value.is_empty() {
            plan.skipped.push(Skipped {
                source: name,
                reason: SkipReason::EmptyPath,
            });
            continue;
        }

        let path = PathBuf::from(value);
        match read_secret(&path) {
            Ok(secret) => plan.assignments.push(SecretAssignment {
                source: name,
                target,
                path,
                value: secret,
            }),
            Err(source) => {
                let source_var = name.to_string_lossy().into_owned();
                plan.skipped.push(Skipped {
                    source: name,
                    reason: SkipReason::Failed(InjectError::Read {
                        source_var,
                        path,
                        source,
                    }),
                });
            }
        }
    }

    plan
}

/// Check that the environment will accept `name=value`.
///
/// `std::env::set_var` panics on these inputs instead of returning an error.
pub fn validate_assignment(name: &OsStr, value: &str) -> Result<(), SetRejection> {
    let bytes = name.as_bytes();
    if bytes.is_empty() {
        return Err(SetRejection::EmptyName);
    }
    if bytes.contains(&b'=') {
        return Err(SetRejection::NameContainsEquals);
    }
    if bytes.contains(&0) {
        return Err(SetRejection::NameContainsNul);
    }
    if value.as_bytes().contains(&0) {
        return Err(SetRejection::ValueContainsNul);
    }
    Ok(())
}

/// Write every planned secret into the process environment.
///
/// Existing values are overwritten. Rejected assignments are logged as
/// warnings and recorded as skipped.
pub fn apply(plan: SecretPlan) -> InjectionReport {
    let mut report = InjectionReport {
        injected: Vec::with_capacity(plan.assignments.len()),
        skipped: plan.skipped,
    };

    for assignment in plan.assignments {
        if let Err(reason) = validate_assignment(&assignment.target, &assignment.value) {
            let err = InjectError::Set {
                target: assignment.target,
                reason,
            };
            warn!("{}", err);
            report.skipped.push(Skipped {
                source: assignment.source,
                reason: SkipReason::Failed(err),
            });
            continue;
        }

        env::set_var(&assignment.target, &assignment.value);
        report.injected.push(assignment.target);
    }

    report
}

/// Run one injection pass over the current process environment.
///
/// Must be called before any other thread reads the environment.
pub fn inject(verbose: bool) -> InjectionReport {
    let plan = plan_secrets(env::vars_os());

    if verbose {
        for skipped in &plan.skipped {
            log_skip(skipped);
        }
    }

    let report = apply(plan);

    if verbose && !report.injected.is_empty() {
        info!("Injected {} secret(s) from files", report.injected_count());
        for name in &report.injected {
            info!("  ✓ {}", name.to_string_lossy());
        }
    }

    report
}

fn log_skip(skipped: &Skipped) {
    match &skipped.reason {
        SkipReason::EmptyPath => {
            info!("Skipping {}: empty path", skipped.source.to_string_lossy());
        }
        SkipReason::Failed(err) => {
            // Set failures are logged by apply()
            if let InjectError::Read { source, .. } = err {
                warn!("{}: {}", err, source);
            }
        }
    }
}
