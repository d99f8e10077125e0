// ABOUTME: Entry point for the sshprobe CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use sshprobe::config::{self, AuthMethod, Config, Target};
use sshprobe::error::{Error, Result};
use sshprobe::output::{Output, OutputMode};
use sshprobe::probe;
use std::env;
use std::io::Write;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag when set
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);
    output.start_timer();

    match run(cli, &output).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output.error(&e.to_string());
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli, output: &Output) -> Result<i32> {
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init { force } => {
            config::init_config(&cwd, force)?;
            output.progress(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(0)
        }
        Commands::Check { method, target } => {
            let config = load_config(cli.config.as_deref(), &cwd, method, target.as_ref())?;
            check(config, output).await
        }
        Commands::Exec {
            method,
            target,
            command,
        } => {
            let config = load_config(cli.config.as_deref(), &cwd, method, target.as_ref())?;
            let result = probe::exec_once(&config, &command).await?;

            let mut stdout = std::io::stdout();
            stdout.write_all(result.output.as_bytes())?;
            stdout.flush()?;

            Ok(result.exit_code.map(|c| c as i32).unwrap_or(0))
        }
    }
}

/// Load the config and apply command-line overrides.
fn load_config(
    path: Option<&Path>,
    cwd: &Path,
    method: Option<AuthMethod>,
    target: Option<&Target>,
) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::discover(cwd)?,
    };

    if let Some(target) = target {
        config = config.with_target(target);
    }

    if let Some(method) = method {
        config = config.with_auth_method(method)?;
    } else {
        config.validate()?;
    }

    Ok(config)
}

/// Probe every configured auth method against the target.
async fn check(config: Config, output: &Output) -> Result<i32> {
    output.progress(&format!(
        "Probing {}@{}:{} ({})",
        config.username, config.host, config.port, config.auth_method
    ));

    let report = probe::run(&config).await?;
    output.report(&report);

    if report.passed() {
        Ok(0)
    } else {
        Err(Error::ProbeFailed {
            failed: report.failed_count(),
            total: report.outcomes.len(),
        })
    }
}
