use assert_cmd::Command;
use std::time::Duration;

/// `ebsmount` with a clean `EBSMOUNT_*` environment.
pub fn ebsmount() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ebsmount"));
    cmd.timeout(Duration::from_secs(30));
    for (key, _) in std::env::vars() {
        if key.starts_with("EBSMOUNT_") || key == "RUST_LOG" {
            cmd.env_remove(key);
        }
    }
    cmd
}
