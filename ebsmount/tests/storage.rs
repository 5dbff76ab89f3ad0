//! Filesystem initializer and mount reconciler against a scripted runner.

use std::path::Path;

use ebsmount::errors::EbsmountError;
use ebsmount::storage::{FilesystemInitializer, FilesystemState, MountReconciler, MountState};
use ebsmount::{CommandOutput, SystemTools};
use ebsmount_test_utils::FakeCommandRunner;
use rstest::rstest;

const DEVICE: &str = "/dev/xvdf";
const MOUNT_POINT: &str = "/data";

const MOUNTED: &str = "\
/dev/nvme0n1p1 on / type ext4 (rw,relatime)
/dev/xvdf on /data type ext4 (rw,relatime)
";

const NOT_MOUNTED: &str = "\
/dev/nvme0n1p1 on / type ext4 (rw,relatime)
/dev/xvdg on /data type xfs (rw)
/dev/xvdf on /data2 type ext4 (rw)
";

async fn mount_with(runner: &FakeCommandRunner) -> Result<MountState, EbsmountError> {
    let tools = SystemTools::default();
    MountReconciler::new(runner, &tools)
        .ensure_mounted(Path::new(DEVICE), Path::new(MOUNT_POINT))
        .await
}

#[tokio::test]
async fn test_formatted_device_is_never_reformatted() {
    let runner = FakeCommandRunner::new().respond(
        "blkid",
        CommandOutput::success().with_stdout("/dev/xvdf: UUID=\"1234\" TYPE=\"ext4\""),
    );
    let tools = SystemTools::default();
    let initializer = FilesystemInitializer::new(&runner, &tools);

    for _ in 0..2 {
        let state = initializer
            .ensure_initialized(Path::new(DEVICE), "ext4")
            .await
            .unwrap();
        assert_eq!(state, FilesystemState::Existing);
    }

    assert_eq!(runner.calls_to("blkid"), 2);
    assert_eq!(runner.calls_to("mkfs.ext4"), 0);
}

#[rstest]
#[case("ext4")]
#[case("xfs")]
#[tokio::test]
async fn test_blank_device_formatted_with_configured_type(#[case] fs_type: &str) {
    let runner = FakeCommandRunner::new().respond("blkid", CommandOutput::failure(2));
    let tools = SystemTools::default();

    let state = FilesystemInitializer::new(&runner, &tools)
        .ensure_initialized(Path::new(DEVICE), fs_type)
        .await
        .unwrap();

    assert_eq!(state, FilesystemState::Formatted);
    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 2);
    let mkfs = format!("/usr/sbin/mkfs.{fs_type}");
    assert_eq!(invocations[1].argv(), vec!["sudo", mkfs.as_str(), DEVICE]);
}

#[tokio::test]
async fn test_fresh_mount() {
    let runner = FakeCommandRunner::new();

    assert_eq!(mount_with(&runner).await.unwrap(), MountState::Fresh);

    let argv: Vec<Vec<String>> = runner
        .invocations()
        .iter()
        .map(|inv| inv.argv().into_iter().map(String::from).collect())
        .collect();
    assert_eq!(
        argv,
        vec![
            vec!["sudo", "mkdir", "-p", MOUNT_POINT],
            vec!["sudo", "mount", DEVICE, MOUNT_POINT],
        ]
    );
}

#[tokio::test]
async fn test_failed_mount_accepted_when_already_mounted() {
    let runner = FakeCommandRunner::new()
        .respond_once("mount", CommandOutput::failure(32))
        .respond_once("mount", CommandOutput::success().with_stdout(MOUNTED));

    assert_eq!(mount_with(&runner).await.unwrap(), MountState::AlreadyMounted);

    // One mount attempt plus one listing; no second mount.
    let mounts: Vec<_> = runner
        .invocations()
        .into_iter()
        .filter(|inv| inv.tool_name() == "mount")
        .collect();
    assert_eq!(mounts.len(), 2);
    assert_eq!(mounts[0].args, vec!["mount", DEVICE, MOUNT_POINT]);
    assert_eq!(mounts[1].argv(), vec!["mount"]);
}

#[tokio::test]
async fn test_failed_mount_without_table_entry_is_fatal() {
    let runner = FakeCommandRunner::new()
        .respond_once("mount", CommandOutput::failure(32).with_stderr("wrong fs type"))
        .respond_once("mount", CommandOutput::success().with_stdout(NOT_MOUNTED));

    let err = mount_with(&runner).await.unwrap_err();

    assert!(matches!(err, EbsmountError::MountUnverified { .. }));
    assert!(err.to_string().contains("cannot mount or verify mount"));
    let source = std::error::Error::source(&err).unwrap().to_string();
    assert!(source.contains("wrong fs type"));
}

#[tokio::test]
async fn test_failed_listing_is_fatal() {
    let runner = FakeCommandRunner::new()
        .respond_once("mount", CommandOutput::failure(32))
        .respond_once("mount", CommandOutput::failure(1));

    let err = mount_with(&runner).await.unwrap_err();

    assert!(matches!(err, EbsmountError::MountUnverified { .. }));
    assert!(err.to_string().contains("cannot mount or verify mount"));
}

#[tokio::test]
async fn test_mkdir_failure_stops_before_mount() {
    let runner = FakeCommandRunner::new().respond("mkdir", CommandOutput::failure(1));

    let err = mount_with(&runner).await.unwrap_err();

    assert!(matches!(err, EbsmountError::ToolFailed { ref tool, .. } if tool == "mkdir"));
    assert_eq!(runner.calls_to("mount"), 0);
}

#[tokio::test]
async fn test_unprivileged_tools_skip_sudo() {
    let runner = FakeCommandRunner::new();
    let tools = SystemTools::default().unprivileged();

    MountReconciler::new(&runner, &tools)
        .ensure_mounted(Path::new(DEVICE), Path::new(MOUNT_POINT))
        .await
        .unwrap();

    assert!(runner.invocations().iter().all(|inv| inv.program != "sudo"));
}
