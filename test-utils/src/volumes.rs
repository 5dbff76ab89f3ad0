use std::collections::VecDeque;

use async_trait::async_trait;
use ebsmount::errors::{EbsmountError, EbsmountResult, ProviderError};
use ebsmount::provider::{Attachment, AttachmentState, Volume, VolumeApi, VolumeFilter};
use parking_lot::Mutex;

/// Arguments of one `attach_volume` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachCall {
    pub device: String,
    pub instance_id: String,
    pub volume_id: String,
}

/// How an accepted attach request progresses.
#[derive(Debug, Clone, Copy)]
enum Settle {
    /// Report `attaching` for this many describes, then `attached`.
    After(u32),
    Never,
}

struct State {
    volumes: Vec<Volume>,
    attach_calls: Vec<AttachCall>,
    attach_failures: VecDeque<ProviderError>,
    describe_failures: VecDeque<ProviderError>,
    describe_calls: usize,
    settle: Settle,
    /// The request the provider accepted, if any.
    accepted: Option<AttachCall>,
    /// Describes served since the attach request was accepted.
    polls_since_attach: u32,
}

/// In-memory provider volume inventory.
///
/// An accepted attach request adds an attachment for the calling instance
/// whose state moves from `attaching` to `attached` as describes are served.
pub struct FakeVolumeApi {
    state: Mutex<State>,
}

impl FakeVolumeApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                volumes: Vec::new(),
                attach_calls: Vec::new(),
                attach_failures: VecDeque::new(),
                describe_failures: VecDeque::new(),
                describe_calls: 0,
                settle: Settle::After(0),
                accepted: None,
                polls_since_attach: 0,
            }),
        }
    }

    /// Add a volume to the inventory.
    pub fn with_volume(self, volume: Volume) -> Self {
        self.state.lock().volumes.push(volume);
        self
    }

    /// Reject the next attach request with `error`.
    pub fn fail_attach(self, error: ProviderError) -> Self {
        self.state.lock().attach_failures.push_back(error);
        self
    }

    /// Fail the next describe call with `error`.
    pub fn fail_describe(self, error: ProviderError) -> Self {
        self.state.lock().describe_failures.push_back(error);
        self
    }

    /// Report `attaching` for `polls` describes after the attach is accepted.
    pub fn settle_after(self, polls: u32) -> Self {
        self.state.lock().settle = Settle::After(polls);
        self
    }

    /// Accepted attachments stay `attaching` forever.
    pub fn never_settle(self) -> Self {
        self.state.lock().settle = Settle::Never;
        self
    }

    pub fn attach_calls(&self) -> Vec<AttachCall> {
        self.state.lock().attach_calls.clone()
    }

    pub fn describe_calls(&self) -> usize {
        self.state.lock().describe_calls
    }
}

impl Default for FakeVolumeApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VolumeApi for FakeVolumeApi {
    async fn describe_volumes(&self, filters: &[VolumeFilter]) -> EbsmountResult<Vec<Volume>> {
        let mut state = self.state.lock();
        state.describe_calls += 1;

        if let Some(error) = state.describe_failures.pop_front() {
            return Err(EbsmountError::Provider(error));
        }

        let settled = match state.settle {
            Settle::After(needed) => state.polls_since_attach >= needed,
            Settle::Never => false,
        };
        if state.accepted.is_some() {
            state.polls_since_attach += 1;
        }

        let accepted = state.accepted.clone();
        let volumes = state
            .volumes
            .iter()
            .filter(|volume| filters.iter().all(|f| f.matches(volume)))
            .map(|volume| {
                let mut volume = volume.clone();
                if let Some(call) = accepted.as_ref().filter(|c| c.volume_id == volume.volume_id) {
                    if volume.attachment_for(&call.instance_id).is_none() {
                        volume.attachments.push(Attachment {
                            instance_id: call.instance_id.clone(),
                            device: call.device.clone(),
                            state: if settled {
                                AttachmentState::Attached
                            } else {
                                AttachmentState::Attaching
                            },
                        });
                    }
                }
                volume
            })
            .collect();

        Ok(volumes)
    }

    async fn attach_volume(
        &self,
        device: &str,
        instance_id: &str,
        volume_id: &str,
    ) -> EbsmountResult<()> {
        let mut state = self.state.lock();
        let call = AttachCall {
            device: device.to_owned(),
            instance_id: instance_id.to_owned(),
            volume_id: volume_id.to_owned(),
        };

        if let Some(error) = state.attach_failures.pop_front() {
            // Rejected requests are recorded but leave no attachment behind.
            state.attach_calls.push(call);
            return Err(EbsmountError::Provider(error));
        }

        state.attach_calls.push(call.clone());
        state.accepted = Some(call);
        state.polls_since_attach = 0;
        Ok(())
    }
}
