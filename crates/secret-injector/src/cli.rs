//! Command-line interface

use clap::Parser;

const AFTER_HELP: &str = r#"EXAMPLES:
    # Inject all *_PATH environment variables and run env
    secret-injector -- env

    # Inject some key and run some binary
    export MY_KEY_PATH=/run/secrets/my_key
    secret-injector --verbose -- some_binary

ENVIRONMENT VARIABLE MAPPING:
    Input Env Var                             Output Env Var
    ──────────────────────────────────────────────────────────────────
    MY_KEY_PATH=/run/secrets/my_key           → MY_KEY=<file contents>
    DB_SECRET_PATH=/run/secrets/db_secret     → DB_SECRET=<file contents>

NOTES:
    - File contents are trimmed of leading/trailing whitespace
    - If a file cannot be read, it is skipped and execution continues
    - The original *_PATH variables remain in the environment
    - SIGINT and SIGTERM are forwarded to the child process
    - Exits with the same exit code as the child process"#;

#[derive(Parser, Debug)]
#[command(name = "secret-injector")]
#[command(version)]
#[command(about = "Inject secrets from files into environment variables, then run a command")]
#[command(long_about = "Inject secrets from files into environment variables, then run a command.\n\n\
    Scans the environment for variables ending in \"_PATH\", reads the files they\n\
    point to, and sets the same variable without the suffix. Useful in containers\n\
    where secrets are mounted as files but the application expects them in its\n\
    environment.")]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    /// Print which secrets were injected or skipped
    #[arg(
        short,
        long,
        env = "SECRET_INJECTOR_VERBOSE",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub verbose: bool,

    /// Command to run with the injected environment
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}
