use std::collections::HashMap;

use async_trait::async_trait;
use ebsmount::errors::{EbsmountError, EbsmountResult};
use ebsmount::provider::{InstanceMetadata, metadata_keys};
use parking_lot::Mutex;

/// In-memory instance metadata.
///
/// Unknown keys fail like an unreachable metadata service.
pub struct FakeMetadata {
    values: HashMap<String, String>,
    queried: Mutex<Vec<String>>,
}

impl FakeMetadata {
    /// Metadata of an instance with the given identity.
    pub fn new(instance_id: &str, availability_zone: &str) -> Self {
        Self::empty()
            .with(metadata_keys::INSTANCE_ID, instance_id)
            .with(metadata_keys::AVAILABILITY_ZONE, availability_zone)
    }

    /// Metadata that answers nothing.
    pub fn empty() -> Self {
        Self {
            values: HashMap::new(),
            queried: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_owned(), value.to_owned());
        self
    }

    /// Keys queried so far, in order.
    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().clone()
    }
}

impl Default for FakeMetadata {
    fn default() -> Self {
        Self::new(crate::INSTANCE_ID, crate::AVAILABILITY_ZONE)
    }
}

#[async_trait]
impl InstanceMetadata for FakeMetadata {
    async fn get_metadata(&self, key: &str) -> EbsmountResult<String> {
        self.queried.lock().push(key.to_owned());
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| EbsmountError::Metadata {
                key: key.to_owned(),
                message: "metadata service unreachable".to_owned(),
            })
    }
}
