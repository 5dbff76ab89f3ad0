//! Filesystem probe and format.

use std::path::Path;

use crate::errors::EbsmountResult;
use crate::util::{CommandRunner, SystemTools};

/// What [`FilesystemInitializer::ensure_initialized`] found on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilesystemState {
    /// A filesystem signature was present; the device was left untouched.
    Existing,
    /// The device was blank and has been formatted.
    Formatted,
}

/// Creates a filesystem on a device only when it has none.
pub struct FilesystemInitializer<'a> {
    runner: &'a dyn CommandRunner,
    tools: &'a SystemTools,
}

impl<'a> FilesystemInitializer<'a> {
    pub fn new(runner: &'a dyn CommandRunner, tools: &'a SystemTools) -> Self {
        Self { runner, tools }
    }

    /// Probe `device` with blkid and format it with `fs_type` if blank.
    ///
    /// Any non-zero probe exit counts as "no filesystem". Data on a device
    /// that blkid recognizes is never touched, so re-running after a reboot
    /// is a no-op.
    pub async fn ensure_initialized(
        &self,
        device: &Path,
        fs_type: &str,
    ) -> EbsmountResult<FilesystemState> {
        let probe = self.tools.probe(device);
        let output = self.runner.run(&probe).await?;
        if output.is_success() {
            tracing::info!(
                device = %device.display(),
                signature = %output.stdout.trim(),
                "Filesystem present, skipping format"
            );
            return Ok(FilesystemState::Existing);
        }

        // blkid exits 2 for no signature and 8 for ambivalent probes (several
        // signatures). Both land here; mkfs refuses the latter on its own.
        tracing::info!(
            probe_exit = ?output.code,
            "No filesystem found on {}, formatting with {}",
            device.display(),
            fs_type
        );

        let format = self.tools.format(fs_type, device);
        self.runner
            .run(&format)
            .await?
            .check(&format, &format!("formatting {}", device.display()))?;

        tracing::info!("Formatted {} with {}", device.display(), fs_type);
        Ok(FilesystemState::Formatted)
    }
}
