//! Error types for kiln-core.

use thiserror::Error;

/// Result type alias for kiln-core operations.
pub type Result<T> = std::result::Result<T, KilnError>;

/// Errors that can occur while running commands, provisioning volumes or polling.
#[derive(Debug, Error)]
pub enum KilnError {
    /// The program could not be found on the host
    #[error("tool not found: {program}")]
    ToolNotFound {
        /// Program that was looked up
        program: String,
    },

    /// The command ran but exited unsuccessfully
    #[error("command `{command}` failed with {}: {stderr}", exit_label(.code))]
    ExecutionFailed {
        /// Rendered command line
        command: String,
        /// Exit code, `None` if the process was killed by a signal
        code: Option<i32>,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// The caller asked for something the current state cannot produce
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),

    /// Polling ran out of attempts without a successful check
    #[error("check did not succeed after {attempts} attempts")]
    PollExhausted {
        /// Number of attempts made
        attempts: u32,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_failed_message() {
        let err = KilnError::ExecutionFailed {
            command: "false".into(),
            code: Some(1),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "command `false` failed with exit code 1: ");

        let err = KilnError::ExecutionFailed {
            command: "sleep 10".into(),
            code: None,
            stderr: "terminated".into(),
        };
        assert!(err.to_string().contains("failed with signal"));
    }

    #[test]
    fn test_poll_exhausted_message() {
        let err = KilnError::PollExhausted { attempts: 3 };
        assert_eq!(err.to_string(), "check did not succeed after 3 attempts");
    }
}
