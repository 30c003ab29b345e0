//! Command-line definitions for `kiln`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "kiln", version, about = "Helpers for container test suites")]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a command and print its stdout.
    Run(RunArgs),
    /// Provision a volume directory and print its mount argument.
    Volume(VolumeArgs),
    /// Wait until a TCP port accepts connections.
    WaitPort(WaitPortArgs),
    /// Wait until a path exists.
    WaitFile(WaitFileArgs),
    /// Print a random lowercase name.
    Name {
        /// Number of letters.
        #[arg(long, default_value_t = kiln_core::DEFAULT_NAME_LEN)]
        len: usize,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Spawn without capturing output and log the pid.
    #[arg(long)]
    pub raw: bool,

    /// Working directory for the command.
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Extra environment variable, as KEY=VALUE.
    #[arg(long = "env", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Command to run. A single argument is split on whitespace.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Args)]
pub struct VolumeArgs {
    /// Directory to use instead of a fresh temp directory.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Mount target inside the container.
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Permission bits, e.g. 0755.
    #[arg(long)]
    pub permissions: Option<String>,

    /// ACL rule, repeatable, e.g. u:26:rwx.
    #[arg(long = "acl")]
    pub acl: Vec<String>,

    /// SELinux type for the directory.
    #[arg(long)]
    pub selinux_type: Option<String>,

    /// Append :Z to the mount argument.
    #[arg(long)]
    pub relabel: bool,
}

/// Polling overrides; unset values come from the environment.
#[derive(Debug, Args)]
pub struct PollArgs {
    /// Maximum number of checks.
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Milliseconds to sleep after each failed check.
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct WaitPortArgs {
    /// Host to connect to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// TCP port.
    #[arg(long)]
    pub port: u16,

    /// Per-attempt connect timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    #[command(flatten)]
    pub poll: PollArgs,
}

#[derive(Debug, Args)]
pub struct WaitFileArgs {
    /// Path to wait for.
    pub path: PathBuf,

    #[command(flatten)]
    pub poll: PollArgs,
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))
}
