//! Cloud provider collaborators.
//!
//! The bootstrap only talks to the provider through two traits:
//! - [`InstanceMetadata`]: identity of the running instance
//! - [`VolumeApi`]: volume inventory and attach requests
//!
//! Production implementations live in [`ec2`] and [`imds`]; tests use fakes.

pub mod ec2;
pub mod imds;
mod types;

pub use ec2::Ec2VolumeApi;
pub use imds::ImdsMetadata;
pub use types::{Attachment, AttachmentState, Volume, VolumeFilter};

use async_trait::async_trait;

use crate::errors::EbsmountResult;

/// Metadata keys queried by the bootstrap.
pub mod metadata_keys {
    /// Availability zone of the running instance.
    pub const AVAILABILITY_ZONE: &str = "placement/availability-zone";

    /// Identifier of the running instance.
    pub const INSTANCE_ID: &str = "instance-id";
}

/// Read access to the running instance's metadata.
#[async_trait]
pub trait InstanceMetadata: Send + Sync {
    /// Fetch a metadata value by key (e.g. `instance-id`).
    async fn get_metadata(&self, key: &str) -> EbsmountResult<String>;
}

/// Provider volume inventory and attachment API.
///
/// Errors are surfaced as [`crate::errors::EbsmountError::Provider`] so the
/// provider's code and message survive unmodified.
#[async_trait]
pub trait VolumeApi: Send + Sync {
    /// List volumes matching every filter.
    async fn describe_volumes(&self, filters: &[VolumeFilter]) -> EbsmountResult<Vec<Volume>>;

    /// Request attaching `volume_id` to `instance_id` as `device`.
    ///
    /// Returns once the provider accepted the request; the attachment itself
    /// completes asynchronously.
    async fn attach_volume(
        &self,
        device: &str,
        instance_id: &str,
        volume_id: &str,
    ) -> EbsmountResult<()>;
}
