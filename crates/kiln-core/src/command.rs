//! Command execution helpers.
//!
//! Runs external programs either to completion (capturing stdout) or in
//! raw mode, where the spawned child is handed back to the caller.

use crate::error::{KilnError, Result};
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Output};
use tracing::{debug, trace, warn};

/// A command line: program followed by its arguments.
///
/// Built from a single string (split on whitespace, so arguments containing
/// spaces cannot be expressed) or from an explicit token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    argv: Vec<String>,
}

impl CommandLine {
    /// Build a command line from explicit tokens.
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a command string on whitespace.
    pub fn parse(cmd: &str) -> Self {
        Self::new(cmd.split_whitespace())
    }

    /// The program to execute, if any.
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Arguments after the program.
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    /// All tokens, program included.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}

impl From<&str> for CommandLine {
    fn from(cmd: &str) -> Self {
        Self::parse(cmd)
    }
}

impl From<String> for CommandLine {
    fn from(cmd: String) -> Self {
        Self::parse(&cmd)
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl From<&[&str]> for CommandLine {
    fn from(argv: &[&str]) -> Self {
        Self::new(argv.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for CommandLine {
    fn from(argv: [&str; N]) -> Self {
        Self::new(argv)
    }
}

/// How a command should be run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Wait for completion and capture stdout (default).
    #[default]
    Capture,
    /// Spawn and return immediately with the child handle.
    Raw,
}

/// Result of [`run_cmd`], depending on the [`RunMode`].
#[derive(Debug)]
pub enum RunOutput {
    /// Standard output of a completed command.
    Captured(Vec<u8>),
    /// A running child process owned by the caller.
    Spawned(Child),
}

impl RunOutput {
    /// Captured stdout, or `None` for a spawned child.
    pub fn into_stdout(self) -> Option<Vec<u8>> {
        match self {
            Self::Captured(stdout) => Some(stdout),
            Self::Spawned(_) => None,
        }
    }

    /// Spawned child, or `None` for captured output.
    pub fn into_child(self) -> Option<Child> {
        match self {
            Self::Captured(_) => None,
            Self::Spawned(child) => Some(child),
        }
    }
}

/// Options forwarded to the process builder without interpretation.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Working directory for the child.
    pub current_dir: Option<PathBuf>,
    /// Extra environment variables.
    pub env: Vec<(OsString, OsString)>,
    /// Start from an empty environment before applying `env`.
    pub env_clear: bool,
}

impl RunOptions {
    /// Set the working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Clear the inherited environment.
    pub fn env_clear(mut self) -> Self {
        self.env_clear = true;
        self
    }

    fn apply(&self, command: &mut Command) {
        if self.env_clear {
            command.env_clear();
        }
        command.envs(self.env.iter().map(|(k, v)| (k, v)));
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
    }
}

/// Run a command in the given mode.
pub fn run_cmd(
    cmd: impl Into<CommandLine>,
    mode: RunMode,
    options: &RunOptions,
) -> Result<RunOutput> {
    let cmd = cmd.into();
    match mode {
        RunMode::Capture => run(cmd, options).map(RunOutput::Captured),
        RunMode::Raw => spawn(cmd, options).map(RunOutput::Spawned),
    }
}

/// Run a command to completion and return its stdout.
///
/// # Errors
///
/// [`KilnError::ToolNotFound`] if the program does not exist,
/// [`KilnError::ExecutionFailed`] if it exits unsuccessfully.
pub fn run(cmd: impl Into<CommandLine>, options: &RunOptions) -> Result<Vec<u8>> {
    let cmd = cmd.into();
    debug!(command = %cmd, "running command");

    let mut command = build(&cmd, options)?;
    let output = command.output().map_err(|e| spawn_error(&cmd, e))?;

    check_status(&cmd, output)
}

/// Spawn a command without waiting for it.
///
/// The caller owns the returned child and is responsible for waiting on or
/// killing it.
pub fn spawn(cmd: impl Into<CommandLine>, options: &RunOptions) -> Result<Child> {
    let cmd = cmd.into();
    debug!(command = %cmd, "spawning command (raw)");

    let mut command = build(&cmd, options)?;
    let child = command.spawn().map_err(|e| spawn_error(&cmd, e))?;
    trace!(command = %cmd, pid = child.id(), "command spawned");
    Ok(child)
}

fn build(cmd: &CommandLine, options: &RunOptions) -> Result<Command> {
    let program = cmd
        .program()
        .ok_or_else(|| KilnError::ConfigurationInvalid("empty command line".into()))?;

    let mut command = Command::new(program);
    command.args(cmd.args());
    options.apply(&mut command);
    Ok(command)
}

fn spawn_error(cmd: &CommandLine, err: io::Error) -> KilnError {
    if err.kind() == io::ErrorKind::NotFound {
        let program = cmd.program().unwrap_or_default().to_string();
        warn!(program = %program, "program not found");
        KilnError::ToolNotFound { program }
    } else {
        warn!(command = %cmd, error = %err, "failed to start command");
        KilnError::Io(err)
    }
}

fn check_status(cmd: &CommandLine, output: Output) -> Result<Vec<u8>> {
    if output.status.success() {
        debug!(command = %cmd, stdout_len = output.stdout.len(), "command completed");
        return Ok(output.stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    debug!(
        command = %cmd,
        exit_code = ?output.status.code(),
        stderr = %stderr,
        "command failed"
    );
    Err(KilnError::ExecutionFailed {
        command: cmd.to_string(),
        code: output.status.code(),
        stderr,
    })
}
