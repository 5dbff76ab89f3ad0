//! Local storage: filesystem initialization and mounting.

mod filesystem;
mod mount;

pub use filesystem::{FilesystemInitializer, FilesystemState};
pub use mount::{MountEntry, MountReconciler, MountState, MountTable};
