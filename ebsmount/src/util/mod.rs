//! Shared helpers: command execution and retry scheduling.

mod backoff;
mod command;

pub use backoff::{Backoff, BackoffPolicy, MaxAttempts, RetryBudget};
pub use command::{
    CommandOutput, CommandRunner, Invocation, OutputMode, SystemCommandRunner, SystemTools,
    mkfs_tool,
};
