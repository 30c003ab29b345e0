//! Tool and probe configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use std::time::Duration;

/// Default number of poll attempts.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 1;

/// Default sleep between poll attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default TCP connect timeout for port checks.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("tool program for {0} is empty")]
    EmptyTool(&'static str),

    #[error("poll interval must be > 0")]
    ZeroInterval,

    #[error("connect timeout must be > 0")]
    ZeroTimeout,
}

/// Programs used to adjust volume directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Permission tool, invoked as `<chmod> <perms> <dir>`.
    pub chmod: String,
    /// ACL tool, invoked as `<setfacl> -m <rule> <dir>`.
    pub setfacl: String,
    /// SELinux label tool, invoked as `<chcon> -t <type> <dir>`.
    pub chcon: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            chmod: "chmod".to_string(),
            setfacl: "setfacl".to_string(),
            chcon: "chcon".to_string(),
        }
    }
}

impl ToolConfig {
    /// Load tool programs from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `KILN_CHMOD` | `chmod` |
    /// | `KILN_SETFACL` | `setfacl` |
    /// | `KILN_CHCON` | `chcon` |
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            chmod: std::env::var("KILN_CHMOD").unwrap_or(default.chmod),
            setfacl: std::env::var("KILN_SETFACL").unwrap_or(default.setfacl),
            chcon: std::env::var("KILN_CHCON").unwrap_or(default.chcon),
        }
    }

    /// Validate that no tool program is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chmod.trim().is_empty() {
            return Err(ConfigError::EmptyTool("chmod"));
        }
        if self.setfacl.trim().is_empty() {
            return Err(ConfigError::EmptyTool("setfacl"));
        }
        if self.chcon.trim().is_empty() {
            return Err(ConfigError::EmptyTool("chcon"));
        }
        Ok(())
    }
}

/// Default polling policy for readiness waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Maximum number of check invocations.
    pub max_attempts: u32,
    /// Sleep after each failed check.
    pub interval: Duration,
    /// TCP connect timeout for port checks.
    pub connect_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_POLL_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ProbeConfig {
    /// Load the polling policy from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `KILN_POLL_ATTEMPTS` | `1` |
    /// | `KILN_POLL_INTERVAL_MS` | `1000` |
    /// | `KILN_CONNECT_TIMEOUT_MS` | `2000` |
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_attempts: std::env::var("KILN_POLL_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_attempts),
            interval: env_millis("KILN_POLL_INTERVAL_MS").unwrap_or(default.interval),
            connect_timeout: env_millis("KILN_CONNECT_TIMEOUT_MS")
                .unwrap_or(default.connect_timeout),
        }
    }

    /// Set the maximum number of attempts.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the interval between attempts.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Validate the policy: interval and connect timeout must be non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}
