//! Entry point for the `ebsmount` binary.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ebsmount::{Bootstrap, Ec2VolumeApi, ImdsMetadata, SystemCommandRunner};

use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    if let Err(e) = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .try_init()
    {
        eprintln!("Failed to initialize tracing: {}", e);
    }

    let config = cli.to_config();
    config.validate().context("invalid configuration")?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let volumes = Ec2VolumeApi::from_region(&config.region).await;
    let bootstrap = Bootstrap::new(
        config,
        Arc::new(ImdsMetadata::new()),
        Arc::new(volumes),
        Arc::new(SystemCommandRunner),
    );

    let report = bootstrap.run().await.context("bootstrap failed")?;
    tracing::info!(
        volume_id = report.volume_id.as_deref().unwrap_or("-"),
        attachment = ?report.attachment,
        filesystem = ?report.filesystem,
        mount = ?report.mount,
        "Bootstrap complete"
    );

    Ok(())
}
