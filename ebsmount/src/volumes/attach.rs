//! Attach-and-confirm state machine.
//!
//! ```text
//!             ┌──────────── already attached to this instance ───────────┐
//!             │                                                          ▼
//! start ──→ [issue attach]* ──→ [describe volume] ──→ [device exists?] ──→ done
//!               ▲   │ err            │ not attached       │ missing
//!               │   ▼                ▼                    ▼
//!               └── backoff sleep ◄──┴────────────────────┘  (until budget exhausted)
//!
//! * skipped once the provider has accepted the request
//! ```

use std::path::{Path, PathBuf};

use crate::errors::{EbsmountError, EbsmountResult};
use crate::provider::{AttachmentState, Volume, VolumeApi, VolumeFilter};
use crate::util::{Backoff, RetryBudget};

/// How an attach run finished.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachOutcome {
    /// The volume was already attached to this instance; nothing was sent.
    AlreadyAttached { device: String },
    /// The attachment was confirmed after `attempts` attempts.
    Attached { attempts: u64 },
}

/// Mutable state of one run of the reconciler.
struct AttachProgress {
    attempts: u64,
    /// The provider accepted the attach request. Distinct from the
    /// attachment being confirmed; once set the request is never re-sent.
    issued: bool,
    last_error: EbsmountError,
    backoff: Backoff,
}

/// Drives a volume to the `attached` state on this instance.
pub struct AttachmentReconciler<'a> {
    api: &'a dyn VolumeApi,
    device: &'a Path,
    budget: &'a RetryBudget,
}

impl<'a> AttachmentReconciler<'a> {
    /// # Arguments
    ///
    /// * `api` - Provider volume API
    /// * `device` - Device path to attach as, also checked locally for presence
    /// * `budget` - Attempt limit and backoff between attempts
    pub fn new(api: &'a dyn VolumeApi, device: &'a Path, budget: &'a RetryBudget) -> Self {
        Self {
            api,
            device,
            budget,
        }
    }

    /// Attach `volume` to `instance_id` and wait until it is usable.
    ///
    /// Returns [`EbsmountError::AttachFailed`] wrapping the last attempt's
    /// error once the budget is exhausted.
    pub async fn attach(
        &self,
        instance_id: &str,
        volume: &Volume,
    ) -> EbsmountResult<AttachOutcome> {
        tracing::info!(
            "Will attach volume {} to instance id {}",
            volume.volume_id,
            instance_id
        );

        // Reboot of the same instance: attachment survived, nothing to do.
        if let Some(existing) = volume.attachment_for(instance_id) {
            tracing::info!(
                "Volume {} is already attached to instance {} as device {}",
                volume.volume_id,
                instance_id,
                existing.device
            );
            return Ok(AttachOutcome::AlreadyAttached {
                device: existing.device.clone(),
            });
        }

        let mut progress = AttachProgress {
            attempts: 0,
            issued: false,
            last_error: EbsmountError::AttemptsExhausted,
            backoff: Backoff::new(self.budget.backoff.clone()),
        };

        while self.budget.max_attempts.allows(progress.attempts) {
            if progress.attempts != 0 {
                let delay = progress.backoff.next_delay();
                tracing::info!(
                    "Waiting for attachment to complete. Retrying in {} seconds. Attempts: {}",
                    delay.as_secs_f64(),
                    progress.attempts
                );
                tokio::time::sleep(delay).await;
            }
            progress.attempts += 1;

            match self.attempt(instance_id, volume, &mut progress.issued).await {
                Ok(()) => {
                    tracing::info!(
                        "Attached volume {} to instance {} as device {}",
                        volume.volume_id,
                        instance_id,
                        self.device.display()
                    );
                    return Ok(AttachOutcome::Attached {
                        attempts: progress.attempts,
                    });
                }
                Err(e) if e.is_retryable() => {
                    tracing::debug!(
                        volume_id = %volume.volume_id,
                        attempt = progress.attempts,
                        error = %e,
                        "Attachment attempt failed"
                    );
                    progress.last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(EbsmountError::AttachFailed {
            volume_id: volume.volume_id.clone(),
            attempts: progress.attempts,
            source: Box::new(progress.last_error),
        })
    }

    /// One pass: issue (if not yet accepted), re-describe, check the device.
    async fn attempt(
        &self,
        instance_id: &str,
        volume: &Volume,
        issued: &mut bool,
    ) -> EbsmountResult<()> {
        if !*issued {
            self.api
                .attach_volume(
                    &self.device.to_string_lossy(),
                    instance_id,
                    &volume.volume_id,
                )
                .await?;
            *issued = true;
            tracing::info!("Volume attachment started. Checking for status");
        }

        let current = self
            .api
            .describe_volumes(&[VolumeFilter::volume_id(&volume.volume_id)])
            .await?
            .into_iter()
            .next();

        let state = current
            .as_ref()
            .and_then(|v| v.attachment_for(instance_id))
            .map(|a| a.state.clone());

        if state != Some(AttachmentState::Attached) {
            return Err(EbsmountError::AttachmentPending {
                volume_id: volume.volume_id.clone(),
                state,
            });
        }

        // The provider may report `attached` before the kernel exposes the device.
        tokio::fs::metadata(self.device)
            .await
            .map_err(|source| EbsmountError::DeviceNotReady {
                device: PathBuf::from(self.device),
                source,
            })?;

        Ok(())
    }
}
