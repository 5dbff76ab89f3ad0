//! Idempotent mount of the device at the mount point.

use std::path::{Path, PathBuf};

use crate::errors::{EbsmountError, EbsmountResult};
use crate::util::{CommandRunner, SystemTools};

/// How [`MountReconciler::ensure_mounted`] reached the mounted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MountState {
    /// The mount command succeeded.
    Fresh,
    /// The mount command failed but the device was already mounted there.
    AlreadyMounted,
}

/// Mounts a device, tolerating a previous run having mounted it already.
pub struct MountReconciler<'a> {
    runner: &'a dyn CommandRunner,
    tools: &'a SystemTools,
}

impl<'a> MountReconciler<'a> {
    pub fn new(runner: &'a dyn CommandRunner, tools: &'a SystemTools) -> Self {
        Self { runner, tools }
    }

    /// Create `mount_point` and mount `device` on it.
    ///
    /// A failed mount is checked against the live mount table; a matching
    /// `<device> on <mount_point>` entry counts as success and no second
    /// mount is attempted.
    pub async fn ensure_mounted(
        &self,
        device: &Path,
        mount_point: &Path,
    ) -> EbsmountResult<MountState> {
        let mkdir = self.tools.make_dir(mount_point);
        self.runner
            .run(&mkdir)
            .await?
            .check(&mkdir, &format!("creating {}", mount_point.display()))?;

        tracing::info!(
            "Mounting {} at {}",
            device.display(),
            mount_point.display()
        );

        let mount = self.tools.mount(device, mount_point);
        let mount_error = match self
            .runner
            .run(&mount)
            .await?
            .check(&mount, &format!("mounting {}", device.display()))
        {
            Ok(_) => {
                tracing::info!("Mounted {} at {}", device.display(), mount_point.display());
                return Ok(MountState::Fresh);
            }
            Err(e) => e,
        };

        tracing::warn!(error = %mount_error, "Mount failed, checking whether already mounted");

        let unverified = |source: EbsmountError| EbsmountError::MountUnverified {
            device: device.to_path_buf(),
            mount_point: mount_point.to_path_buf(),
            source: Box::new(source),
        };

        let list = self.tools.list_mounts();
        let listing = self
            .runner
            .run(&list)
            .await
            .and_then(|output| output.check(&list, "listing mounts"))
            .map_err(unverified)?;

        if MountTable::parse(&listing.stdout).contains(device, mount_point) {
            tracing::info!(
                "{} is already mounted at {}",
                device.display(),
                mount_point.display()
            );
            Ok(MountState::AlreadyMounted)
        } else {
            Err(unverified(mount_error))
        }
    }
}

/// One `<device> on <mount point>` line of `mount` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: PathBuf,
    pub mount_point: PathBuf,
}

/// Parsed output of `mount` without arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountTable {
    pub entries: Vec<MountEntry>,
}

impl MountTable {
    /// Parse Linux (`dev on mp type fs (opts)`) and BSD (`dev on mp (opts)`)
    /// style listings. Lines without ` on ` are skipped.
    pub fn parse(listing: &str) -> Self {
        let entries = listing
            .lines()
            .filter_map(|line| {
                let (device, rest) = line.split_once(" on ")?;
                let end = rest
                    .find(" type ")
                    .or_else(|| rest.find(" ("))
                    .unwrap_or(rest.len());
                Some(MountEntry {
                    device: PathBuf::from(device.trim()),
                    mount_point: PathBuf::from(rest[..end].trim()),
                })
            })
            .collect();
        Self { entries }
    }

    /// Whether `device` is mounted exactly at `mount_point`.
    ///
    /// Devices compare equal by path or by symlink-resolved path, since
    /// provider device names are often links to the kernel name.
    pub fn contains(&self, device: &Path, mount_point: &Path) -> bool {
        let wanted = canonical(device);
        self.entries.iter().any(|entry| {
            entry.mount_point == mount_point
                && (entry.device == device || canonical(&entry.device) == wanted)
        })
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
