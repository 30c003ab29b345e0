//! # kiln-core
//!
//! Helpers for container test suites: running commands, provisioning bind
//! mount volumes, and waiting for services to become ready.
//!
//! ## Quick Start
//!
//! ```no_run
//! use kiln_core::{probe, Volume};
//! use std::time::Duration;
//!
//! # fn example() -> kiln_core::Result<()> {
//! // Prepare a volume for the container under test
//! let mut volume = Volume::builder().permissions("0755").create()?;
//! volume.set_target("/data");
//! let mount = volume.mount_argument()?; // "-v /tmp/kiln-volume-...:/data"
//!
//! let stdout = kiln_core::run(
//!     format!("podman run -d {mount} docker.io/library/nginx").as_str(),
//!     &kiln_core::RunOptions::default(),
//! )?;
//! println!("started {}", String::from_utf8_lossy(&stdout).trim());
//!
//! // Wait up to 10 seconds for the service to listen
//! probe::wait_for_port("127.0.0.1", 8080, 10, Duration::from_secs(1))?;
//!
//! volume.clean()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Command Runner**: capture stdout or spawn and hand back the child
//! - **Volumes**: temp or given directories with chmod, ACL and SELinux setup
//! - **Probes**: bounded fixed-interval polling for ports and files

mod command;
mod config;
mod error;
mod name;
pub mod probe;
mod volume;

pub use command::{run, run_cmd, spawn, CommandLine, RunMode, RunOptions, RunOutput};
pub use config::{
    ConfigError, ProbeConfig, ToolConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_POLL_ATTEMPTS,
    DEFAULT_POLL_INTERVAL,
};
pub use error::{KilnError, Result};
pub use name::{random_name, DEFAULT_NAME_LEN};
pub use probe::{check_file_exists, check_port_open, poll_until, wait_for_file, wait_for_port};
pub use volume::{Volume, VolumeBuilder};
