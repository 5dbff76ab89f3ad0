//! Constants for ebsmount
//!
//! Centralized location for defaults, tool paths and backoff parameters.

/// Defaults for the bootstrap configuration.
pub mod defaults {
    /// Region used when none is given.
    pub const REGION: &str = "eu-west-1";

    /// Where the volume is mounted.
    pub const MOUNT_POINT: &str = "/data";

    /// Device name the volume is attached as.
    pub const BLOCK_DEVICE: &str = "/dev/xvdf";

    /// Filesystem created on a blank volume.
    pub const FILESYSTEM_TYPE: &str = "ext4";
}

/// Attachment wait schedule.
pub mod backoff {
    use std::time::Duration;

    pub const MIN: Duration = Duration::from_secs(5);

    pub const MAX: Duration = Duration::from_secs(100);

    pub const FACTOR: f64 = 2.0;

    /// Stand-in for a zero minimum so retries never spin.
    pub const FLOOR: Duration = Duration::from_millis(100);
}

/// OS tools invoked by the storage reconcilers.
pub mod tools {
    pub const SUDO: &str = "sudo";

    pub const BLKID: &str = "/usr/sbin/blkid";

    /// Directory of the `mkfs.<type>` helpers.
    pub const MKFS_DIR: &str = "/usr/sbin";

    pub const MKFS_PREFIX: &str = "mkfs.";

    pub const MKDIR: &str = "mkdir";

    pub const MOUNT: &str = "mount";
}
