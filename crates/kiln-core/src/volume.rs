//! Volume provisioning.
//!
//! A [`Volume`] is a host directory prepared for use as a container bind
//! mount. Permission bits, ACL rules and an SELinux label are applied through
//! external tools as soon as they are set.

use crate::command::{run, CommandLine, RunOptions};
use crate::config::ToolConfig;
use crate::error::{KilnError, Result};
use std::fmt;
use std::fs::{self, DirBuilder};
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Prefix for auto-generated volume directories.
const TEMP_PREFIX: &str = "kiln-volume-";

/// A host directory with an optional in-container mount target.
///
/// The directory exists for as long as the volume does; it is only removed by
/// [`Volume::clean`].
#[derive(Debug)]
pub struct Volume {
    directory: PathBuf,
    target: Option<PathBuf>,
    force_selinux_relabel: bool,
    tools: ToolConfig,
}

impl Volume {
    /// Create a volume backed by a fresh temporary directory.
    pub fn new() -> Result<Self> {
        Self::builder().create()
    }

    /// Create a volume builder.
    pub fn builder() -> VolumeBuilder {
        VolumeBuilder::default()
    }

    /// Host directory backing the volume.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Mount target inside the container, if set.
    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    /// Whether mount arguments request an SELinux relabel.
    pub fn force_selinux_relabel(&self) -> bool {
        self.force_selinux_relabel
    }

    /// Set the mount target.
    pub fn set_target(&mut self, target: impl Into<PathBuf>) {
        self.target = Some(target.into());
    }

    /// Toggle the `:Z` relabel suffix on mount arguments.
    pub fn set_force_selinux_relabel(&mut self, value: bool) {
        self.force_selinux_relabel = value;
    }

    /// Change the permission bits of the directory (e.g. `"0755"`, `"u+w"`).
    pub fn set_permission(&self, perms: &str) -> Result<()> {
        debug!(directory = %self.directory.display(), perms, "setting permissions");
        self.run_tool(&self.tools.chmod, &[perms])
    }

    /// Apply ACL rules, one tool invocation per rule.
    ///
    /// Stops at the first failing rule; rules already applied stay applied.
    pub fn set_acl<I, S>(&self, rules: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for rule in rules {
            let rule = rule.as_ref();
            debug!(directory = %self.directory.display(), rule, "applying ACL rule");
            self.run_tool(&self.tools.setfacl, &["-m", rule])?;
        }
        Ok(())
    }

    /// Set the SELinux type of the directory itself (not recursive).
    pub fn set_selinux(&self, selinux_type: &str) -> Result<()> {
        debug!(directory = %self.directory.display(), selinux_type, "setting SELinux type");
        self.run_tool(&self.tools.chcon, &["-t", selinux_type])
    }

    /// Render the `-v <directory>:<target>[:Z]` argument for a container runtime.
    ///
    /// # Errors
    ///
    /// [`KilnError::ConfigurationInvalid`] if no target is set or it is empty.
    pub fn mount_argument(&self) -> Result<String> {
        let target = self
            .target
            .as_ref()
            .filter(|t| !t.as_os_str().is_empty())
            .ok_or_else(|| {
            KilnError::ConfigurationInvalid(format!(
                "no mount target set for volume {}",
                self.directory.display()
            ))
        })?;

        let mut arg = format!("-v {}:{}", self.directory.display(), target.display());
        if self.force_selinux_relabel {
            arg.push_str(":Z");
        }
        Ok(arg)
    }

    /// Directory and target, without validation.
    pub fn as_pair(&self) -> (&Path, Option<&Path>) {
        (&self.directory, self.target.as_deref())
    }

    /// Remove the directory and everything below it.
    pub fn clean(self) -> Result<()> {
        info!(directory = %self.directory.display(), "removing volume");
        fs::remove_dir_all(&self.directory)?;
        Ok(())
    }

    fn run_tool(&self, program: &str, args: &[&str]) -> Result<()> {
        let dir = self.directory.to_string_lossy();
        let argv = std::iter::once(program)
            .chain(args.iter().copied())
            .chain(std::iter::once(&*dir));
        run(CommandLine::new(argv), &RunOptions::default())?;
        Ok(())
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.directory.display())
    }
}

/// Builder for [`Volume`].
///
/// Nothing touches the filesystem until [`VolumeBuilder::create`].
#[derive(Debug, Default)]
pub struct VolumeBuilder {
    directory: Option<PathBuf>,
    target: Option<PathBuf>,
    permissions: Option<String>,
    acl_rules: Vec<String>,
    selinux_type: Option<String>,
    force_selinux_relabel: bool,
    tools: ToolConfig,
}

impl VolumeBuilder {
    /// Use (and create if missing) this directory instead of a temp directory.
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = Some(dir.into());
        self
    }

    /// Set the mount target.
    pub fn target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Permission bits applied after creation.
    pub fn permissions(mut self, perms: impl Into<String>) -> Self {
        self.permissions = Some(perms.into());
        self
    }

    /// Add one ACL rule (e.g. `"u:26:rwx"`).
    pub fn acl_rule(mut self, rule: impl Into<String>) -> Self {
        self.acl_rules.push(rule.into());
        self
    }

    /// Add several ACL rules, applied in order.
    pub fn acl_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.acl_rules.extend(rules.into_iter().map(Into::into));
        self
    }

    /// SELinux type applied after permissions and ACLs.
    pub fn selinux_type(mut self, selinux_type: impl Into<String>) -> Self {
        self.selinux_type = Some(selinux_type.into());
        self
    }

    /// Request the `:Z` relabel suffix on mount arguments.
    pub fn force_selinux_relabel(mut self, value: bool) -> Self {
        self.force_selinux_relabel = value;
        self
    }

    /// Programs used for permission, ACL and label changes.
    pub fn tools(mut self, tools: ToolConfig) -> Self {
        self.tools = tools;
        self
    }

    /// Create the directory and apply permissions, ACL rules and the SELinux
    /// type, in that order.
    ///
    /// A failing step aborts creation; the directory and earlier steps are
    /// left in place.
    pub fn create(self) -> Result<Volume> {
        self.tools
            .validate()
            .map_err(|e| KilnError::ConfigurationInvalid(e.to_string()))?;

        let directory = match self.directory {
            Some(dir) => {
                // no-op for an existing directory, fails for anything else
                fs::create_dir_all(&dir)?;
                dir
            }
            None => create_temp_dir()?,
        };

        let volume = Volume {
            directory,
            target: self.target,
            force_selinux_relabel: self.force_selinux_relabel,
            tools: self.tools,
        };

        if let Some(perms) = &self.permissions {
            volume.set_permission(perms)?;
        }
        if !self.acl_rules.is_empty() {
            volume.set_acl(&self.acl_rules)?;
        }
        if let Some(selinux_type) = &self.selinux_type {
            volume.set_selinux(selinux_type)?;
        }

        info!(directory = %volume.directory.display(), "volume ready");
        Ok(volume)
    }
}

/// Create a uniquely named directory under the system temp dir, mode 0700.
fn create_temp_dir() -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("{TEMP_PREFIX}{}", Uuid::new_v4().simple()));
    DirBuilder::new().mode(0o700).create(&dir)?;
    Ok(dir)
}
