//! Error types for the bootstrap run.
//!
//! Errors are categorized by how the run reacts to them:
//! - [`EbsmountError::Provider`], [`EbsmountError::AttachmentPending`] and
//!   [`EbsmountError::DeviceNotReady`] are retried by the attachment
//!   reconciler and fatal everywhere else
//! - everything else aborts the run on first occurrence

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::provider::AttachmentState;

/// Result alias used across the crate.
pub type EbsmountResult<T> = Result<T, EbsmountError>;

/// Errors that can occur while locating, attaching, formatting or mounting a volume.
#[derive(Debug, Error)]
pub enum EbsmountError {
    /// Invalid or inconsistent configuration (user-fixable).
    #[error("config: {0}")]
    Config(String),

    /// The instance metadata service could not answer a query.
    #[error("instance metadata '{key}': {message}")]
    Metadata { key: String, message: String },

    /// No volume matched the id and availability zone filters.
    #[error("cannot find volume with volume-id: {volume_id} in availability zone {availability_zone}")]
    VolumeNotFound {
        volume_id: String,
        availability_zone: String,
    },

    /// Error reported by the provider's volume API.
    #[error("provider: {0}")]
    Provider(#[from] ProviderError),

    /// The provider has not (yet) reported the attachment as attached.
    #[error("volume {volume_id} attachment not ready (state: {})", display_state(.state))]
    AttachmentPending {
        volume_id: String,
        state: Option<AttachmentState>,
    },

    /// The provider reports the volume attached but the OS device is not visible yet.
    #[error("block device {} not present: {source}", .device.display())]
    DeviceNotReady {
        device: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Every attempt of the retry budget failed.
    #[error("attaching volume {volume_id} failed after {attempts} attempt(s)")]
    AttachFailed {
        volume_id: String,
        attempts: u64,
        #[source]
        source: Box<EbsmountError>,
    },

    /// The retry budget did not allow a single attempt.
    #[error("max attempts exceeded")]
    AttemptsExhausted,

    /// An OS tool could not be spawned.
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// An OS tool exited unsuccessfully.
    #[error("{tool} failed ({context}): exit status {}{}", display_code(.code), display_stderr(.stderr))]
    ToolFailed {
        tool: String,
        context: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The mount command failed and the mount table does not confirm the mount.
    #[error(
        "cannot mount or verify mount of {} at {}, cowardly refusing to continue",
        .device.display(),
        .mount_point.display()
    )]
    MountUnverified {
        device: PathBuf,
        mount_point: PathBuf,
        #[source]
        source: Box<EbsmountError>,
    },

    /// Generic IO error (catch-all).
    #[error("io: {0}")]
    Io(#[from] io::Error),
}

impl EbsmountError {
    /// Whether the attachment reconciler may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EbsmountError::Provider(_)
                | EbsmountError::AttachmentPending { .. }
                | EbsmountError::DeviceNotReady { .. }
        )
    }
}

/// Tagged error from the provider's API.
///
/// Keeps the provider's own error code and message instead of an opaque
/// SDK error so they show up verbatim in the abort message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// Provider error code, e.g. `InvalidVolume.NotFound` or `RequestLimitExceeded`.
    pub code: Option<String>,
    pub message: String,
    /// Provider/transport hint that repeating the call may succeed.
    pub retryable: bool,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            retryable: false,
        }
    }

    /// Error without a provider code (transport failures, timeouts).
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message)?,
            None => write!(f, "{}", self.message)?,
        }
        if self.retryable {
            write!(f, " (retryable)")?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {}

fn display_state(state: &Option<AttachmentState>) -> String {
    match state {
        Some(state) => state.to_string(),
        None => "no attachment".to_string(),
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "killed by signal".to_string(),
    }
}

fn display_stderr(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_provider_error_display_keeps_code() {
        let err = ProviderError::new("IncorrectState", "vol-1 is not available");
        assert_eq!(err.to_string(), "IncorrectState: vol-1 is not available");

        let err = ProviderError::transport("connection reset");
        assert_eq!(err.to_string(), "connection reset (retryable)");
    }

    #[test]
    fn test_attach_failed_chains_last_error() {
        let err = EbsmountError::AttachFailed {
            volume_id: "vol-1".into(),
            attempts: 3,
            source: Box::new(EbsmountError::AttachmentPending {
                volume_id: "vol-1".into(),
                state: Some(AttachmentState::Attaching),
            }),
        };

        assert_eq!(
            err.to_string(),
            "attaching volume vol-1 failed after 3 attempt(s)"
        );
        let source = err.source().expect("source should be kept");
        assert_eq!(
            source.to_string(),
            "volume vol-1 attachment not ready (state: attaching)"
        );
    }

    #[test]
    fn test_tool_failed_includes_stderr() {
        let err = EbsmountError::ToolFailed {
            tool: "mkfs.ext4".into(),
            context: "formatting /dev/xvdf".into(),
            code: Some(1),
            stderr: "device is busy\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "mkfs.ext4 failed (formatting /dev/xvdf): exit status 1: device is busy"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(EbsmountError::Provider(ProviderError::transport("timeout")).is_retryable());
        assert!(
            EbsmountError::AttachmentPending {
                volume_id: "vol-1".into(),
                state: None,
            }
            .is_retryable()
        );
        assert!(!EbsmountError::Config("bad".into()).is_retryable());
        assert!(
            !EbsmountError::VolumeNotFound {
                volume_id: "vol-1".into(),
                availability_zone: "eu-west-1a".into(),
            }
            .is_retryable()
        );
    }
}
