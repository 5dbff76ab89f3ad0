#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use ebsmount::{BackoffPolicy, BootstrapConfig, MaxAttempts, RetryBudget};
use ebsmount::{MountSpec, SystemTools};
use ebsmount_test_utils::VOLUME_ID;

pub const MOUNT_POINT: &str = "/data";

/// Default schedule (5s, 10s, 20s, ... capped at 100s) with `max` attempts.
pub fn budget(max: u64) -> RetryBudget {
    RetryBudget::new(MaxAttempts::Bounded(max), BackoffPolicy::default())
}

/// Sub-second schedule for tests that only care about ordering.
pub fn quick_budget(max: u64) -> RetryBudget {
    RetryBudget::new(
        MaxAttempts::Bounded(max),
        BackoffPolicy {
            min: Duration::from_millis(10),
            max: Duration::from_millis(100),
            factor: 2.0,
            jitter: false,
        },
    )
}

/// Config attaching [`VOLUME_ID`] as `device` and mounting at [`MOUNT_POINT`].
pub fn config(device: &Path) -> BootstrapConfig {
    BootstrapConfig {
        volume_id: Some(VOLUME_ID.to_owned()),
        mount: MountSpec {
            device: device.to_path_buf(),
            mount_point: MOUNT_POINT.into(),
            filesystem_type: "ext4".to_owned(),
        },
        retry: quick_budget(5),
        tools: SystemTools::default(),
        ..Default::default()
    }
}
