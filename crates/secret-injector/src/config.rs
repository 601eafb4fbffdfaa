//! Resolved runtime configuration

use crate::cli::Cli;
use crate::error::SupervisorError;

/// Everything one run needs, after argument parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectorConfig {
    pub verbose: bool,
    pub program: String,
    pub args: Vec<String>,
}

impl InjectorConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, SupervisorError> {
        let mut command = cli.command.into_iter();
        let program = command
            .next()
            .filter(|program| !program.is_empty())
            .ok_or(SupervisorError::EmptyCommand)?;

        Ok(Self {
            verbose: cli.verbose,
            program,
            args: command.collect(),
        })
    }

    /// Default `tracing` filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_from_cli_splits_program() {
        let cli = Cli {
            verbose: true,
            command: vec!["node".into(), "server.js".into(), "--port=80".into()],
        };
        let config = InjectorConfig::from_cli(cli).unwrap();
        assert_eq!(config.program, "node");
        assert_eq!(config.args, vec!["server.js", "--port=80"]);
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn test_from_cli_empty_command() {
        let cli = Cli {
            verbose: false,
            command: Vec::new(),
        };
        assert!(matches!(
            InjectorConfig::from_cli(cli),
            Err(SupervisorError::EmptyCommand)
        ));
    }

    #[test]
    fn test_from_cli_blank_program() {
        // `secret-injector -- ""` must fail before any injection happens
        let cli = Cli::try_parse_from(["secret-injector", "--", "", "arg"]).unwrap();
        assert!(matches!(
            InjectorConfig::from_cli(cli),
            Err(SupervisorError::EmptyCommand)
        ));
    }
}
