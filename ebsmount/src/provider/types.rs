//! Provider-side volume model.
//!
//! These mirror what the provider reports; nothing here is mutated
//! locally; state changes are only observed by describing the volume again.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Provider-tracked lifecycle state of an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentState {
    Attaching,
    Attached,
    Detaching,
    Detached,
    Busy,
    /// Any state string the provider added after this enum was written.
    #[serde(untagged)]
    Unknown(String),
}

impl AttachmentState {
    pub fn as_str(&self) -> &str {
        match self {
            AttachmentState::Attaching => "attaching",
            AttachmentState::Attached => "attached",
            AttachmentState::Detaching => "detaching",
            AttachmentState::Detached => "detached",
            AttachmentState::Busy => "busy",
            AttachmentState::Unknown(s) => s,
        }
    }
}

impl From<&str> for AttachmentState {
    fn from(s: &str) -> Self {
        match s {
            "attaching" => AttachmentState::Attaching,
            "attached" => AttachmentState::Attached,
            "detaching" => AttachmentState::Detaching,
            "detached" => AttachmentState::Detached,
            "busy" => AttachmentState::Busy,
            other => AttachmentState::Unknown(other.to_string()),
        }
    }
}

impl FromStr for AttachmentState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AttachmentState::from(s))
    }
}

impl fmt::Display for AttachmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binding of a volume to an instance at a device path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub instance_id: String,
    pub device: String,
    pub state: AttachmentState,
}

/// A network-attached block volume as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub volume_id: String,
    pub availability_zone: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Volume {
    pub fn new(volume_id: impl Into<String>, availability_zone: impl Into<String>) -> Self {
        Self {
            volume_id: volume_id.into(),
            availability_zone: availability_zone.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Attachment owned by `instance_id`, if the provider reports one.
    pub fn attachment_for(&self, instance_id: &str) -> Option<&Attachment> {
        self.attachments
            .iter()
            .find(|a| a.instance_id == instance_id)
    }
}

/// Name/values predicate of a describe-volumes query.
///
/// Values within one filter are OR-ed, separate filters are AND-ed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeFilter {
    pub name: String,
    pub values: Vec<String>,
}

impl VolumeFilter {
    pub const VOLUME_ID: &'static str = "volume-id";
    pub const AVAILABILITY_ZONE: &'static str = "availability-zone";

    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    pub fn volume_id(volume_id: impl Into<String>) -> Self {
        Self::new(Self::VOLUME_ID, volume_id)
    }

    pub fn availability_zone(zone: impl Into<String>) -> Self {
        Self::new(Self::AVAILABILITY_ZONE, zone)
    }

    /// Evaluate the predicate against a volume.
    ///
    /// Unknown filter names never match, like the provider rejecting them.
    pub fn matches(&self, volume: &Volume) -> bool {
        let field = match self.name.as_str() {
            Self::VOLUME_ID => &volume.volume_id,
            Self::AVAILABILITY_ZONE => &volume.availability_zone,
            _ => return false,
        };
        self.values.iter().any(|v| v == field)
    }
}
