//! Volume lookup by id and availability zone.

use crate::errors::{EbsmountError, EbsmountResult};
use crate::provider::{Volume, VolumeApi, VolumeFilter};

/// Find `volume_id` in `availability_zone`.
///
/// Both are filter predicates of a single describe call, so a returned
/// volume always carries the queried id and zone. An empty result is
/// [`EbsmountError::VolumeNotFound`]; provider errors pass through as-is.
/// Not retried.
pub async fn locate(
    api: &dyn VolumeApi,
    volume_id: &str,
    availability_zone: &str,
) -> EbsmountResult<Volume> {
    let filters = [
        VolumeFilter::volume_id(volume_id),
        VolumeFilter::availability_zone(availability_zone),
    ];

    let volume = api
        .describe_volumes(&filters)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| EbsmountError::VolumeNotFound {
            volume_id: volume_id.to_owned(),
            availability_zone: availability_zone.to_owned(),
        })?;

    tracing::info!(
        volume_id = %volume.volume_id,
        availability_zone = %volume.availability_zone,
        attachments = volume.attachments.len(),
        "Found volume"
    );

    Ok(volume)
}
