use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Stand-in for a block device node under a temporary directory.
///
/// The path starts out absent, like a device the kernel has not exposed
/// yet, until [`FakeDevice::appear`] creates it.
pub struct FakeDevice {
    _dir: TempDir,
    path: PathBuf,
}

impl FakeDevice {
    pub fn absent() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("xvdf");
        Self { _dir: dir, path }
    }

    pub fn present() -> Self {
        let device = Self::absent();
        device.appear();
        device
    }

    pub fn appear(&self) {
        std::fs::write(&self.path, b"").expect("create fake device node");
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
