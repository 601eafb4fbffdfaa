//! Child-process supervision
//!
//! Runs the command with the (already injected) environment and all three
//! standard streams inherited. SIGINT and SIGTERM are caught before the child
//! starts and relayed to it unchanged; the parent exits only when the child does.

use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, info, warn};

use crate::config::InjectorConfig;
use crate::error::SupervisorError;

/// Launches one child and mirrors its exit code
#[derive(Debug, Clone)]
pub struct Supervisor {
    program: String,
    args: Vec<String>,
    verbose: bool,
}

impl Supervisor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            verbose: false,
        }
    }

    pub fn from_config(config: &InjectorConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone()).verbose(config.verbose)
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Start the child, forward signals until it exits, return its exit code.
    pub async fn run(&self) -> Result<i32, SupervisorError> {
        if self.program.is_empty() {
            return Err(SupervisorError::EmptyCommand);
        }

        // Handlers go in before the child exists so no signal falls through
        // to the default disposition in between.
        let sigint = signal(SignalKind::interrupt()).map_err(SupervisorError::Signals)?;
        let sigterm = signal(SignalKind::terminate()).map_err(SupervisorError::Signals)?;

        if self.verbose {
            // Arguments may carry secrets
            info!("Executing: {} [hidden args]", self.program);
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let forwarder = child
            .id()
            .map(|pid| tokio::spawn(forward_signals(pid, sigint, sigterm)));

        let status = child.wait().await;

        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }

        let status = status.map_err(SupervisorError::Wait)?;
        debug!("Child exited: {}", status);
        Ok(exit_code(status))
    }
}

/// Relay SIGINT/SIGTERM to `pid` until both streams close or the task is aborted
async fn forward_signals(pid: u32, mut sigint: Signal, mut sigterm: Signal) {
    loop {
        let signo = tokio::select! {
            Some(()) = sigint.recv() => libc::SIGINT,
            Some(()) = sigterm.recv() => libc::SIGTERM,
            else => break,
        };

        debug!("Forwarding signal {} to child {}", signo, pid);
        if let Err(err) = send_signal(pid, signo) {
            warn!("Failed to forward signal {} to child {}: {}", signo, pid, err);
        }
    }
}

/// Deliver `signo` to process `pid`
pub fn send_signal(pid: u32, signo: libc::c_int) -> io::Result<()> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    let rc = unsafe { libc::kill(pid, signo) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Exit code to report for a finished child.
///
/// A child killed by a signal has no exit code; report `128 + signal` like a shell.
pub fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signo)) => 128 + signo,
        (None, None) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};
    use std::time::Duration;

    // Signals sent to the test process reach every running forwarder, so
    // tests that run a child through the supervisor take turns.
    static SUPERVISED: Mutex<()> = Mutex::new(());

    fn supervised() -> MutexGuard<'static, ()> {
        SUPERVISED.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn sh(script: &str) -> Supervisor {
        Supervisor::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    /// Run `script` and send `signo` to this test process once the child is up
    async fn run_and_signal_parent(script: &str, signo: libc::c_int) -> i32 {
        let sender = tokio::spawn(async move {
            // Give the child time to install its trap
            tokio::time::sleep(Duration::from_millis(300)).await;
            let rc = unsafe { libc::kill(libc::getpid(), signo) };
            assert_eq!(rc, 0);
        });

        let code = sh(script).run().await.unwrap();
        sender.await.unwrap();
        code
    }

    #[tokio::test]
    async fn test_propagates_exit_code() {
        let _guard = supervised();
        assert_eq!(sh("exit 7").run().await.unwrap(), 7);
        assert_eq!(sh("exit 0").run().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_child_sees_injected_environment() {
        let _guard = supervised();
        std::env::set_var("SI_SUPERVISOR_ENV_CHECK", "visible");
        let code = sh(r#"[ "$SI_SUPERVISOR_ENV_CHECK" = visible ]"#)
            .run()
            .await
            .unwrap();
        std::env::remove_var("SI_SUPERVISOR_ENV_CHECK");
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_signal_terminated_child() {
        let _guard = supervised();
        let code = sh("kill -TERM $$").run().await.unwrap();
        assert_eq!(code, 128 + libc::SIGTERM);
    }

    #[tokio::test]
    async fn test_forwards_sigterm_to_child() {
        let _guard = supervised();
        let code = run_and_signal_parent(
            "trap 'exit 42' TERM; while :; do sleep 0.05; done",
            libc::SIGTERM,
        )
        .await;
        assert_eq!(code, 42);
    }

    #[tokio::test]
    async fn test_forwards_sigint_and_keeps_waiting() {
        let _guard = supervised();
        // The child keeps running for a while after the signal; the parent
        // must still report the child's own exit code.
        let code = run_and_signal_parent(
            "trap 'sleep 0.2; exit 43' INT; while :; do sleep 0.05; done",
            libc::SIGINT,
        )
        .await;
        assert_eq!(code, 43);
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let err = Supervisor::new("/nonexistent/secret-injector-test-binary", Vec::new())
            .run()
            .await
            .unwrap_err();
        match err {
            SupervisorError::Spawn { program, source } => {
                assert_eq!(program, "/nonexistent/secret-injector-test-binary");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("Expected spawn error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_program() {
        let err = Supervisor::new("", Vec::new()).run().await.unwrap_err();
        assert!(matches!(err, SupervisorError::EmptyCommand));
    }

    #[tokio::test]
    async fn test_send_signal_reaches_child() {
        let mut child = Command::new("sh")
            .args(["-c", "trap 'exit 42' TERM; while :; do sleep 0.05; done"])
            .spawn()
            .unwrap();
        let pid = child.id().unwrap();

        // Give the shell time to install its trap
        tokio::time::sleep(Duration::from_millis(300)).await;
        send_signal(pid, libc::SIGTERM).unwrap();

        let status = child.wait().await.unwrap();
        assert_eq!(exit_code(status), 42);
    }

    #[test]
    fn test_exit_code_mapping() {
        // Raw wait statuses: exit code in the high byte, signal in the low bits
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(7 << 8)), 7);
        assert_eq!(exit_code(ExitStatus::from_raw(libc::SIGKILL)), 128 + 9);
    }
}
