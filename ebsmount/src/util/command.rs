//! OS command execution.
//!
//! Every external tool (blkid, mkfs, mkdir, mount) goes through
//! [`CommandRunner`] so the storage reconcilers can be exercised against a
//! fake runner without privileged operations.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{EbsmountError, EbsmountResult};
use crate::runtime::constants::tools;

/// Where a command's stdout/stderr go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect output into [`CommandOutput`].
    Capture,
    /// Pass through to the operator's terminal; `CommandOutput` streams stay empty.
    Inherit,
}

/// A single command line to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub output: OutputMode,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            output: OutputMode::Capture,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn inherit_output(mut self) -> Self {
        self.output = OutputMode::Inherit;
        self
    }

    /// Full argv, program first.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    /// File name of the spawned program, `sudo` included.
    pub fn program_name(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.program)
    }

    /// Name of the tool doing the work, skipping a `sudo` wrapper.
    pub fn tool_name(&self) -> &str {
        let program = if is_sudo(&self.program) {
            self.args.first().map(String::as_str).unwrap_or(&self.program)
        } else {
            &self.program
        };
        Path::new(program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(program)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

fn is_sudo(program: &str) -> bool {
    Path::new(program).file_name().and_then(|n| n.to_str()) == Some("sudo")
}

/// Exit status and captured streams of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            ..Default::default()
        }
    }

    pub fn failure(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Default::default()
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into [`EbsmountError::ToolFailed`].
    pub fn check(self, invocation: &Invocation, context: &str) -> EbsmountResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(EbsmountError::ToolFailed {
                tool: invocation.tool_name().to_owned(),
                context: context.to_owned(),
                code: self.code,
                stderr: self.stderr,
            })
        }
    }
}

/// Executes command lines.
///
/// Only a failure to spawn is an `Err`; a non-zero exit is reported through
/// [`CommandOutput::code`] and left to the caller to interpret.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> EbsmountResult<CommandOutput>;
}

/// [`CommandRunner`] that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, invocation: &Invocation) -> EbsmountResult<CommandOutput> {
        tracing::debug!(command = %invocation, "Running command");

        let mut command = tokio::process::Command::new(&invocation.program);
        command.args(&invocation.args).stdin(Stdio::null());

        // Name what failed to start, which may be the sudo wrapper itself.
        let spawn_error = |source: std::io::Error| EbsmountError::Spawn {
            tool: invocation.program_name().to_owned(),
            source,
        };

        let result = match invocation.output {
            OutputMode::Capture => {
                let output = command.output().await.map_err(spawn_error)?;
                CommandOutput {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                }
            }
            OutputMode::Inherit => {
                let status = command
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .await
                    .map_err(spawn_error)?;
                CommandOutput {
                    code: status.code(),
                    ..Default::default()
                }
            }
        };

        tracing::trace!(command = %invocation, code = ?result.code, "Command finished");
        Ok(result)
    }
}

/// Paths of the OS tools and whether they run through `sudo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemTools {
    /// Privilege wrapper, `None` to run tools directly.
    pub sudo: Option<PathBuf>,
    pub blkid: PathBuf,
    /// Directory holding `mkfs.<type>` binaries.
    pub mkfs_dir: PathBuf,
    pub mkdir: PathBuf,
    pub mount: PathBuf,
}

impl Default for SystemTools {
    fn default() -> Self {
        Self {
            sudo: Some(PathBuf::from(tools::SUDO)),
            blkid: PathBuf::from(tools::BLKID),
            mkfs_dir: PathBuf::from(tools::MKFS_DIR),
            mkdir: PathBuf::from(tools::MKDIR),
            mount: PathBuf::from(tools::MOUNT),
        }
    }
}

impl SystemTools {
    /// Same tools, invoked without `sudo`.
    pub fn unprivileged(mut self) -> Self {
        self.sudo = None;
        self
    }

    /// Invocation of `program`, wrapped in `sudo` when configured.
    pub fn privileged(&self, program: &Path) -> Invocation {
        match &self.sudo {
            Some(sudo) => {
                Invocation::new(sudo.display().to_string()).arg(program.display().to_string())
            }
            None => Invocation::new(program.display().to_string()),
        }
    }

    /// `blkid <device>`: exit 0 iff a filesystem signature is found.
    pub fn probe(&self, device: &Path) -> Invocation {
        self.privileged(&self.blkid).arg(device.display().to_string())
    }

    /// `mkfs.<fs_type> <device>`, output passed through.
    pub fn format(&self, fs_type: &str, device: &Path) -> Invocation {
        self.privileged(&self.mkfs_dir.join(mkfs_tool(fs_type)))
            .arg(device.display().to_string())
            .inherit_output()
    }

    /// `mkdir -p <dir>`, output passed through.
    pub fn make_dir(&self, dir: &Path) -> Invocation {
        self.privileged(&self.mkdir)
            .args(["-p".to_string(), dir.display().to_string()])
            .inherit_output()
    }

    /// `mount <device> <mount_point>`, output passed through.
    pub fn mount(&self, device: &Path, mount_point: &Path) -> Invocation {
        self.privileged(&self.mount)
            .args([device.display().to_string(), mount_point.display().to_string()])
            .inherit_output()
    }

    /// `mount` without arguments: the live mount table. Never needs privileges.
    pub fn list_mounts(&self) -> Invocation {
        Invocation::new(self.mount.display().to_string())
    }
}

/// Conventional name of the formatting tool for a filesystem type.
pub fn mkfs_tool(fs_type: &str) -> String {
    format!("{}{}", tools::MKFS_PREFIX, fs_type)
}
