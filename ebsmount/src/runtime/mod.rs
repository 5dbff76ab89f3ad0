//! Run configuration.

pub mod constants;
pub mod options;

pub use options::{BootstrapConfig, MountSpec};
