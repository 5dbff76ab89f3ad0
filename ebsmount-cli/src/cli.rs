//! Command-line flags and their conversion into a [`BootstrapConfig`].

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use ebsmount::runtime::constants::{backoff, defaults};
use ebsmount::{BackoffPolicy, BootstrapConfig, MaxAttempts, MountSpec, RetryBudget, SystemTools};

/// Attach, format and mount a persistent EBS volume at instance boot.
#[derive(Parser, Debug)]
#[command(name = "ebsmount", author, version, about, long_about = None)]
pub struct Cli {
    /// AWS region the instance runs in
    #[arg(long, env = "EBSMOUNT_AWS_REGION", default_value = defaults::REGION)]
    pub aws_region: String,

    /// Volume to attach (required unless --use-ebs=false)
    #[arg(long, env = "EBSMOUNT_EBS_VOLUME_ID")]
    pub ebs_volume_id: Option<String>,

    /// Directory to mount the volume at
    #[arg(long, env = "EBSMOUNT_MOUNT_POINT", default_value = defaults::MOUNT_POINT)]
    pub mount_point: PathBuf,

    /// Device path the volume is attached as
    #[arg(long, env = "EBSMOUNT_BLOCK_DEVICE", default_value = defaults::BLOCK_DEVICE)]
    pub block_device: PathBuf,

    /// Filesystem created on a blank device (mkfs.<type>)
    #[arg(long, env = "EBSMOUNT_FILESYSTEM_TYPE", default_value = defaults::FILESYSTEM_TYPE)]
    pub filesystem_type: String,

    /// Attach an EBS volume; false only formats and mounts the block device
    #[arg(
        long,
        env = "EBSMOUNT_USE_EBS",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub use_ebs: bool,

    /// Attempts to wait for the attachment; unlimited when omitted
    #[arg(long, env = "EBSMOUNT_MAX_ATTEMPTS")]
    pub max_attempts: Option<u64>,

    /// First retry delay, in seconds
    #[arg(long, env = "EBSMOUNT_BACKOFF_MIN", value_parser = parse_seconds, default_value = "5")]
    pub backoff_min: Duration,

    /// Upper bound of the retry delay, in seconds
    #[arg(long, env = "EBSMOUNT_BACKOFF_MAX", value_parser = parse_seconds, default_value = "100")]
    pub backoff_max: Duration,

    /// Growth factor of the retry delay
    #[arg(long, env = "EBSMOUNT_BACKOFF_FACTOR", default_value_t = backoff::FACTOR)]
    pub backoff_factor: f64,

    /// Randomize retry delays
    #[arg(long, env = "EBSMOUNT_BACKOFF_JITTER")]
    pub backoff_jitter: bool,

    /// Run blkid, mkfs, mkdir and mount directly instead of through sudo
    #[arg(long, env = "EBSMOUNT_NO_SUDO")]
    pub no_sudo: bool,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "EBSMOUNT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Resolve flags into the run's configuration. Not validated.
    pub fn to_config(&self) -> BootstrapConfig {
        let tools = if self.no_sudo {
            SystemTools::default().unprivileged()
        } else {
            SystemTools::default()
        };

        BootstrapConfig {
            region: self.aws_region.clone(),
            use_ebs: self.use_ebs,
            volume_id: self.ebs_volume_id.clone(),
            mount: MountSpec {
                device: self.block_device.clone(),
                mount_point: self.mount_point.clone(),
                filesystem_type: self.filesystem_type.clone(),
            },
            retry: RetryBudget::new(
                self.max_attempts
                    .map(MaxAttempts::Bounded)
                    .unwrap_or(MaxAttempts::Unbounded),
                BackoffPolicy {
                    min: self.backoff_min,
                    max: self.backoff_max,
                    factor: self.backoff_factor,
                    jitter: self.backoff_jitter,
                },
            ),
            tools,
        }
    }
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .parse()
        .map_err(|e| format!("invalid number of seconds '{}': {}", s, e))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ebsmount").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_resolve_to_default_config() {
        let config = parse(&["--ebs-volume-id", "vol-1"]).to_config();
        assert_eq!(
            config,
            BootstrapConfig {
                volume_id: Some("vol-1".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_use_ebs_accepts_explicit_value() {
        assert!(!parse(&["--use-ebs=false"]).use_ebs);
        assert!(!parse(&["--use-ebs", "false"]).use_ebs);
        assert!(parse(&["--use-ebs"]).use_ebs);
    }

    #[test]
    fn test_backoff_and_attempts() {
        let config = parse(&[
            "--ebs-volume-id",
            "vol-1",
            "--max-attempts",
            "4",
            "--backoff-min",
            "0.5",
            "--backoff-max",
            "30",
            "--backoff-factor",
            "3",
            "--backoff-jitter",
        ])
        .to_config();

        assert_eq!(config.retry.max_attempts, MaxAttempts::Bounded(4));
        assert_eq!(config.retry.backoff.min, Duration::from_millis(500));
        assert_eq!(config.retry.backoff.max, Duration::from_secs(30));
        assert_eq!(config.retry.backoff.factor, 3.0);
        assert!(config.retry.backoff.jitter);
    }

    #[test]
    fn test_no_sudo() {
        let config = parse(&["--no-sudo"]).to_config();
        assert_eq!(config.tools.sudo, None);
    }

    #[test]
    fn test_negative_seconds_rejected() {
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
        assert_eq!(parse_seconds("2").unwrap(), Duration::from_secs(2));
    }
}
