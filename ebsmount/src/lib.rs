//! Boot-time provisioning of a persistent block volume.
//!
//! A run locates a network volume by id in the instance's availability
//! zone, attaches it to the running instance, waits until the provider and
//! the kernel both report it usable, creates a filesystem if the device is
//! blank and mounts it. Every step is safe to re-run after a reboot.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ebsmount::{Bootstrap, BootstrapConfig, Ec2VolumeApi, ImdsMetadata, SystemCommandRunner};
//!
//! # async fn example() -> ebsmount::EbsmountResult<()> {
//! let config = BootstrapConfig {
//!     volume_id: Some("vol-0123456789abcdef0".into()),
//!     ..Default::default()
//! };
//! let volumes = Ec2VolumeApi::from_region(&config.region).await;
//! let report = Bootstrap::new(
//!     config,
//!     Arc::new(ImdsMetadata::new()),
//!     Arc::new(volumes),
//!     Arc::new(SystemCommandRunner),
//! )
//! .run()
//! .await?;
//! println!("{report:?}");
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod errors;
pub mod provider;
pub mod runtime;
pub mod storage;
pub mod util;
pub mod volumes;

pub use bootstrap::{Bootstrap, BootstrapReport};
pub use errors::{EbsmountError, EbsmountResult, ProviderError};
pub use provider::{
    Attachment, AttachmentState, Ec2VolumeApi, ImdsMetadata, InstanceMetadata, Volume,
    VolumeApi, VolumeFilter,
};
pub use runtime::{BootstrapConfig, MountSpec};
pub use util::{
    BackoffPolicy, CommandOutput, CommandRunner, Invocation, MaxAttempts, RetryBudget,
    SystemCommandRunner, SystemTools,
};
