//! Instance metadata service (IMDSv2) client.

use async_trait::async_trait;
use aws_config::imds::Client;
use aws_sdk_ec2::error::DisplayErrorContext;

use super::InstanceMetadata;
use crate::errors::{EbsmountError, EbsmountResult};

const META_DATA_PREFIX: &str = "/latest/meta-data/";

/// [`InstanceMetadata`] backed by the EC2 instance metadata service.
pub struct ImdsMetadata {
    client: Client,
}

impl ImdsMetadata {
    pub fn new() -> Self {
        Self {
            client: Client::builder().build(),
        }
    }
}

impl Default for ImdsMetadata {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InstanceMetadata for ImdsMetadata {
    async fn get_metadata(&self, key: &str) -> EbsmountResult<String> {
        let path = metadata_path(key);

        let value = self
            .client
            .get(path)
            .await
            .map_err(|e| EbsmountError::Metadata {
                key: key.to_owned(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let value: &str = value.as_ref();
        tracing::debug!(key = %key, value = %value, "Instance metadata fetched");
        Ok(value.trim().to_owned())
    }
}

fn metadata_path(key: &str) -> String {
    format!("{}{}", META_DATA_PREFIX, key.trim_start_matches('/'))
}
