// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use sshprobe::config::{AuthMethod, Target};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sshprobe")]
#[command(about = "Verify SSH authentication and command execution against a server")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to the config file (default: discover sshprobe.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new sshprobe.yml configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Authenticate with each configured method and check command output
    Check {
        /// Override the configured auth method (user-pass, key, user-pass-key)
        #[arg(short, long)]
        method: Option<AuthMethod>,

        /// Override the target as [user@]host[:port]
        #[arg(short, long)]
        target: Option<Target>,
    },

    /// Run a single command and print its merged output
    Exec {
        /// Override the configured auth method (user-pass, key, user-pass-key)
        #[arg(short, long)]
        method: Option<AuthMethod>,

        /// Override the target as [user@]host[:port]
        #[arg(short, long)]
        target: Option<Target>,

        /// Command to run on the server
        command: String,
    },
}
