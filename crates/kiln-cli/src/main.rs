//! kiln: command-line entry point.
//!
//! Exposes the kiln-core helpers to shell scripts and CI jobs. Logs go to
//! stderr so stdout only carries command output, mount arguments and names.

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, PollArgs, RunArgs, VolumeArgs, WaitFileArgs, WaitPortArgs};
use kiln_core::{probe, CommandLine, ProbeConfig, RunOptions, ToolConfig, Volume};
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // "kiln" also matches kiln_core targets (prefix match)
    let default_directive = if cli.verbose { "kiln=debug" } else { "kiln=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(default_directive.parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Run(args) => run(args),
        Command::Volume(args) => volume(args).map(|_| ExitCode::SUCCESS),
        Command::WaitPort(args) => wait_port(args).map(|_| ExitCode::SUCCESS),
        Command::WaitFile(args) => wait_file(args).map(|_| ExitCode::SUCCESS),
        Command::Name { len } => {
            println!("{}", kiln_core::random_name(len));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run(args: RunArgs) -> anyhow::Result<ExitCode> {
    let command = match args.command.as_slice() {
        [single] => CommandLine::parse(single),
        tokens => CommandLine::new(tokens.iter().cloned()),
    };

    let mut options = RunOptions::default();
    if let Some(cwd) = args.cwd {
        options = options.current_dir(cwd);
    }
    for (key, value) in args.env {
        options = options.env(key, value);
    }

    if args.raw {
        let mut child = kiln_core::spawn(command.clone(), &options)?;
        tracing::info!(pid = child.id(), command = %command, "raw command spawned");
        let status = child
            .wait()
            .with_context(|| format!("waiting for `{command}`"))?;
        tracing::debug!(%status, "raw command exited");
        let code = status.code().unwrap_or(1).clamp(0, 255) as u8;
        return Ok(ExitCode::from(code));
    }

    let stdout = kiln_core::run(command, &options)?;
    std::io::stdout().write_all(&stdout)?;
    Ok(ExitCode::SUCCESS)
}

fn volume(args: VolumeArgs) -> anyhow::Result<()> {
    let tools = ToolConfig::from_env();
    tracing::debug!(?tools, "tool configuration loaded");

    let mut builder = Volume::builder()
        .tools(tools)
        .acl_rules(args.acl)
        .force_selinux_relabel(args.relabel);
    if let Some(dir) = args.dir {
        builder = builder.directory(dir);
    }
    if let Some(target) = args.target {
        builder = builder.target(target);
    }
    if let Some(perms) = args.permissions {
        builder = builder.permissions(perms);
    }
    if let Some(selinux_type) = args.selinux_type {
        builder = builder.selinux_type(selinux_type);
    }

    let volume = builder.create().context("provisioning volume")?;
    match volume.target() {
        Some(_) => println!("{}", volume.mount_argument()?),
        None => println!("{volume}"),
    }
    Ok(())
}

/// Merge command-line overrides into the environment policy.
fn poll_policy(poll: &PollArgs, timeout_ms: Option<u64>) -> anyhow::Result<ProbeConfig> {
    let mut config = ProbeConfig::from_env();
    if let Some(attempts) = poll.attempts {
        config = config.max_attempts(attempts);
    }
    if let Some(ms) = poll.interval_ms {
        config = config.interval(Duration::from_millis(ms));
    }
    if let Some(ms) = timeout_ms {
        config = config.connect_timeout(Duration::from_millis(ms));
    }
    config.validate()?;
    Ok(config)
}

fn wait_port(args: WaitPortArgs) -> anyhow::Result<()> {
    let config = poll_policy(&args.poll, args.timeout_ms)?;
    tracing::info!(host = %args.host, port = args.port, ?config, "waiting for port");

    let attempt = probe::wait_for_port_with_timeout(
        &args.host,
        args.port,
        config.max_attempts,
        config.interval,
        config.connect_timeout,
    )
    .with_context(|| format!("{}:{} is not accepting connections", args.host, args.port))?;

    tracing::info!(attempt, "port open");
    Ok(())
}

fn wait_file(args: WaitFileArgs) -> anyhow::Result<()> {
    let config = poll_policy(&args.poll, None)?;
    tracing::info!(path = %args.path.display(), ?config, "waiting for file");

    let attempt = probe::wait_for_file(&args.path, config.max_attempts, config.interval)
        .with_context(|| format!("{} does not exist", args.path.display()))?;

    tracing::info!(attempt, "file present");
    Ok(())
}
