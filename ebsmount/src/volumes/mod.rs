//! Network volume lookup and attachment.

mod attach;
mod locator;

pub use attach::{AttachOutcome, AttachmentReconciler};
pub use locator::locate;
