//! Configuration for a bootstrap run.
//!
//! Built once at startup and passed by reference into every component;
//! nothing below this module reads flags or environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{EbsmountError, EbsmountResult};
use crate::runtime::constants::defaults;
use crate::util::{MaxAttempts, RetryBudget, SystemTools};

// ============================================================================
// Mount Options
// ============================================================================

/// Device, mount point and filesystem type of the run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    /// Block device the volume is attached as (or local device when EBS is off).
    pub device: PathBuf,

    /// Directory the device is mounted at.
    pub mount_point: PathBuf,

    /// Filesystem created on a blank device, e.g. `ext4` or `xfs`.
    pub filesystem_type: String,
}

impl Default for MountSpec {
    fn default() -> Self {
        Self {
            device: PathBuf::from(defaults::BLOCK_DEVICE),
            mount_point: PathBuf::from(defaults::MOUNT_POINT),
            filesystem_type: defaults::FILESYSTEM_TYPE.to_string(),
        }
    }
}

// ============================================================================
// Bootstrap Options
// ============================================================================

/// Immutable configuration of one bootstrap run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Provider region the instance runs in.
    pub region: String,

    /// Locate and attach a network volume before formatting/mounting.
    ///
    /// When false only filesystem init and mount run, against `mount.device`
    /// (e.g. instance store).
    pub use_ebs: bool,

    /// Volume to attach. Required when `use_ebs` is set.
    #[serde(default)]
    pub volume_id: Option<String>,

    pub mount: MountSpec,

    /// Attempt limit and backoff for waiting on the attachment.
    #[serde(default)]
    pub retry: RetryBudget,

    #[serde(default)]
    pub tools: SystemTools,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            region: defaults::REGION.to_string(),
            use_ebs: true,
            volume_id: None,
            mount: MountSpec::default(),
            retry: RetryBudget::default(),
            tools: SystemTools::default(),
        }
    }
}

impl BootstrapConfig {
    /// Check the configuration is usable before anything touches the system.
    pub fn validate(&self) -> EbsmountResult<()> {
        if self.use_ebs {
            match self.volume_id.as_deref().map(str::trim) {
                None | Some("") => {
                    return Err(EbsmountError::Config(
                        "a volume id is required when EBS attachment is enabled".into(),
                    ));
                }
                Some(_) => {}
            }
        }

        if self.region.trim().is_empty() {
            return Err(EbsmountError::Config("region must not be empty".into()));
        }

        if !self.mount.device.is_absolute() {
            return Err(EbsmountError::Config(format!(
                "block device must be an absolute path: {}",
                self.mount.device.display()
            )));
        }

        if !self.mount.mount_point.is_absolute() {
            return Err(EbsmountError::Config(format!(
                "mount point must be an absolute path: {}",
                self.mount.mount_point.display()
            )));
        }

        let fs_type = &self.mount.filesystem_type;
        if fs_type.is_empty() || !fs_type.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(EbsmountError::Config(format!(
                "invalid filesystem type '{}': expected a mkfs suffix such as ext4 or xfs",
                fs_type
            )));
        }

        if self.retry.max_attempts == MaxAttempts::Bounded(0) {
            return Err(EbsmountError::Config(
                "max attempts must be at least 1".into(),
            ));
        }

        let backoff = &self.retry.backoff;
        if backoff.min.is_zero() {
            return Err(EbsmountError::Config(
                "backoff minimum must be positive".into(),
            ));
        }
        if backoff.min > backoff.max {
            return Err(EbsmountError::Config(format!(
                "backoff minimum ({:?}) exceeds maximum ({:?})",
                backoff.min, backoff.max
            )));
        }
        if !backoff.factor.is_finite() || backoff.factor < 1.0 {
            return Err(EbsmountError::Config(format!(
                "backoff factor must be >= 1, got {}",
                backoff.factor
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn valid() -> BootstrapConfig {
        BootstrapConfig {
            volume_id: Some("vol-0123".into()),
            ..Default::default()
        }
    }

    fn config_error(config: &BootstrapConfig) -> String {
        match config.validate() {
            Err(EbsmountError::Config(msg)) => msg,
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let config = BootstrapConfig::default();
        assert_eq!(config.region, "eu-west-1");
        assert!(config.use_ebs);
        assert_eq!(config.mount.device, PathBuf::from("/dev/xvdf"));
        assert_eq!(config.mount.mount_point, PathBuf::from("/data"));
        assert_eq!(config.mount.filesystem_type, "ext4");
        assert_eq!(config.retry.max_attempts, MaxAttempts::Unbounded);
        assert!(config.tools.sudo.is_some());
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_volume_id_required_with_ebs() {
        let config = BootstrapConfig::default();
        assert!(config_error(&config).contains("volume id"));

        let config = BootstrapConfig {
            volume_id: Some("  ".into()),
            ..Default::default()
        };
        assert!(config_error(&config).contains("volume id"));
    }

    #[test]
    fn test_volume_id_optional_without_ebs() {
        let config = BootstrapConfig {
            use_ebs: false,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_relative_paths_rejected() {
        let mut config = valid();
        config.mount.mount_point = PathBuf::from("data");
        assert!(config_error(&config).contains("mount point"));

        let mut config = valid();
        config.mount.device = PathBuf::from("xvdf");
        assert!(config_error(&config).contains("block device"));
    }

    #[test]
    fn test_filesystem_type_must_be_plain_suffix() {
        let mut config = valid();
        config.mount.filesystem_type = "ext4; rm -rf /".into();
        assert!(config_error(&config).contains("filesystem type"));

        config.mount.filesystem_type = "xfs".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = valid();
        config.retry.max_attempts = MaxAttempts::Bounded(0);
        assert!(config_error(&config).contains("max attempts"));
    }

    #[test]
    fn test_backoff_bounds_checked() {
        let mut config = valid();
        config.retry.backoff.min = Duration::from_secs(200);
        assert!(config_error(&config).contains("backoff minimum"));

        let mut config = valid();
        config.retry.backoff.min = Duration::ZERO;
        assert!(config_error(&config).contains("backoff minimum must be positive"));

        let mut config = valid();
        config.retry.backoff.factor = 0.5;
        assert!(config_error(&config).contains("factor"));
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = valid();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: BootstrapConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
