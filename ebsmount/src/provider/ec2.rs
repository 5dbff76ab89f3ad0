//! EC2-backed [`VolumeApi`].

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::Filter;

use super::{Attachment, AttachmentState, Volume, VolumeApi, VolumeFilter};
use crate::errors::{EbsmountError, EbsmountResult, ProviderError};

/// Error codes EC2 documents as safe to retry.
const RETRYABLE_CODES: &[&str] = &[
    "RequestLimitExceeded",
    "Throttling",
    "ThrottlingException",
    "InternalError",
    "Unavailable",
    "ServiceUnavailable",
];

/// [`VolumeApi`] backed by the EC2 API.
#[derive(Clone, Debug)]
pub struct Ec2VolumeApi {
    client: Client,
}

impl Ec2VolumeApi {
    /// Build a client for `region` using the default credential chain.
    pub async fn from_region(region: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_owned()))
            .load()
            .await;

        tracing::debug!(region = %region, "EC2 client configured");
        Self::from_client(Client::new(&sdk_config))
    }

    /// Wrap a pre-built client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VolumeApi for Ec2VolumeApi {
    async fn describe_volumes(&self, filters: &[VolumeFilter]) -> EbsmountResult<Vec<Volume>> {
        let mut request = self.client.describe_volumes();
        for filter in filters {
            request = request.filters(
                Filter::builder()
                    .name(&filter.name)
                    .set_values(Some(filter.values.clone()))
                    .build(),
            );
        }

        let output = request.send().await.map_err(provider_error)?;

        Ok(output.volumes().iter().filter_map(convert_volume).collect())
    }

    async fn attach_volume(
        &self,
        device: &str,
        instance_id: &str,
        volume_id: &str,
    ) -> EbsmountResult<()> {
        let output = self
            .client
            .attach_volume()
            .device(device)
            .instance_id(instance_id)
            .volume_id(volume_id)
            .send()
            .await
            .map_err(provider_error)?;

        tracing::debug!(
            volume_id = %volume_id,
            state = ?output.state().map(|s| s.as_str()),
            "AttachVolume accepted"
        );
        Ok(())
    }
}

fn convert_volume(volume: &aws_sdk_ec2::types::Volume) -> Option<Volume> {
    // A volume without an id cannot be attached; EC2 never returns one.
    let volume_id = volume.volume_id()?;

    let attachments = volume
        .attachments()
        .iter()
        .map(|a| Attachment {
            instance_id: a.instance_id().unwrap_or_default().to_owned(),
            device: a.device().unwrap_or_default().to_owned(),
            state: a
                .state()
                .map(|s| AttachmentState::from(s.as_str()))
                .unwrap_or_else(|| AttachmentState::Unknown(String::new())),
        })
        .collect();

    Some(Volume {
        volume_id: volume_id.to_owned(),
        availability_zone: volume.availability_zone().unwrap_or_default().to_owned(),
        attachments,
    })
}

/// Convert an SDK error into a tagged [`ProviderError`].
fn provider_error<E, R>(err: SdkError<E, R>) -> EbsmountError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let retryable = match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            true
        }
        SdkError::ServiceError(_) => err.code().is_some_and(is_retryable_code),
        _ => false,
    };

    let message = err
        .message()
        .map(str::to_owned)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    EbsmountError::Provider(ProviderError {
        code: err.code().map(str::to_owned),
        message,
        retryable,
    })
}

fn is_retryable_code(code: &str) -> bool {
    RETRYABLE_CODES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::{VolumeAttachment, VolumeAttachmentState};

    #[test]
    fn test_convert_volume_maps_attachments() {
        let ec2_volume = aws_sdk_ec2::types::Volume::builder()
            .volume_id("vol-0123")
            .availability_zone("eu-west-1a")
            .attachments(
                VolumeAttachment::builder()
                    .instance_id("i-abc")
                    .device("/dev/xvdf")
                    .state(VolumeAttachmentState::Attaching)
                    .build(),
            )
            .build();

        let volume = convert_volume(&ec2_volume).expect("volume has an id");
        assert_eq!(volume.volume_id, "vol-0123");
        assert_eq!(volume.availability_zone, "eu-west-1a");
        assert_eq!(
            volume.attachments,
            vec![Attachment {
                instance_id: "i-abc".into(),
                device: "/dev/xvdf".into(),
                state: AttachmentState::Attaching,
            }]
        );
    }

    #[test]
    fn test_convert_volume_without_id_is_skipped() {
        let ec2_volume = aws_sdk_ec2::types::Volume::builder()
            .availability_zone("eu-west-1a")
            .build();
        assert!(convert_volume(&ec2_volume).is_none());
    }

    #[test]
    fn test_retryable_codes() {
        assert!(is_retryable_code("RequestLimitExceeded"));
        assert!(!is_retryable_code("InvalidVolume.NotFound"));
        assert!(!is_retryable_code("UnauthorizedOperation"));
    }
}
