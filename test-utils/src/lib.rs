//! Fakes of the ebsmount collaborators for integration tests.
//!
//! Each fake records how it was called so tests can assert on the exact
//! sequence of provider and OS interactions.

mod device;
mod metadata;
mod runner;
mod volumes;

pub use device::FakeDevice;
pub use metadata::FakeMetadata;
pub use runner::FakeCommandRunner;
pub use volumes::{AttachCall, FakeVolumeApi};

/// Instance id the fakes consider "this instance".
pub const INSTANCE_ID: &str = "i-0123456789abcdef0";

/// Availability zone of [`INSTANCE_ID`].
pub const AVAILABILITY_ZONE: &str = "eu-west-1a";

/// Volume the fakes know about by default.
pub const VOLUME_ID: &str = "vol-0123456789abcdef0";
