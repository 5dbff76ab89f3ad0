//! End-to-end bootstrap run: locate → attach → format → mount.

use std::sync::Arc;

use serde::Serialize;

use crate::errors::EbsmountResult;
use crate::provider::{InstanceMetadata, VolumeApi, metadata_keys};
use crate::runtime::BootstrapConfig;
use crate::storage::{FilesystemInitializer, FilesystemState, MountReconciler, MountState};
use crate::util::CommandRunner;
use crate::volumes::{self, AttachOutcome, AttachmentReconciler};

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    /// Volume that was attached; `None` when EBS attachment is disabled.
    pub volume_id: Option<String>,
    pub attachment: Option<AttachOutcome>,
    pub filesystem: FilesystemState,
    pub mount: MountState,
}

/// Drives one bootstrap run against the given collaborators.
///
/// Every step gates the next; the first unrecovered error aborts the run.
pub struct Bootstrap {
    config: BootstrapConfig,
    metadata: Arc<dyn InstanceMetadata>,
    volumes: Arc<dyn VolumeApi>,
    runner: Arc<dyn CommandRunner>,
}

impl Bootstrap {
    pub fn new(
        config: BootstrapConfig,
        metadata: Arc<dyn InstanceMetadata>,
        volumes: Arc<dyn VolumeApi>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            metadata,
            volumes,
            runner,
        }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Validate the configuration and run every step in order.
    pub async fn run(&self) -> EbsmountResult<BootstrapReport> {
        self.config.validate()?;

        let (volume_id, attachment) = if self.config.use_ebs {
            let (volume_id, outcome) = self.attach_volume().await?;
            (Some(volume_id), Some(outcome))
        } else {
            tracing::info!("EBS attachment disabled, using local device");
            (None, None)
        };

        let mount = &self.config.mount;
        let filesystem = FilesystemInitializer::new(self.runner.as_ref(), &self.config.tools)
            .ensure_initialized(&mount.device, &mount.filesystem_type)
            .await?;

        let mount_state = MountReconciler::new(self.runner.as_ref(), &self.config.tools)
            .ensure_mounted(&mount.device, &mount.mount_point)
            .await?;

        Ok(BootstrapReport {
            volume_id,
            attachment,
            filesystem,
            mount: mount_state,
        })
    }

    async fn attach_volume(&self) -> EbsmountResult<(String, AttachOutcome)> {
        // validate() guarantees a volume id when use_ebs is set
        let volume_id = self
            .config
            .volume_id
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_owned();

        let availability_zone = self
            .metadata
            .get_metadata(metadata_keys::AVAILABILITY_ZONE)
            .await?;
        let instance_id = self.metadata.get_metadata(metadata_keys::INSTANCE_ID).await?;
        tracing::info!(
            instance_id = %instance_id,
            availability_zone = %availability_zone,
            "Resolved instance identity"
        );

        let volume = volumes::locate(self.volumes.as_ref(), &volume_id, &availability_zone).await?;

        let outcome = AttachmentReconciler::new(
            self.volumes.as_ref(),
            &self.config.mount.device,
            &self.config.retry,
        )
        .attach(&instance_id, &volume)
        .await?;

        Ok((volume_id, outcome))
    }
}
