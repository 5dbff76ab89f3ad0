use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use ebsmount::errors::EbsmountResult;
use ebsmount::util::{CommandOutput, CommandRunner, Invocation};
use parking_lot::Mutex;

#[derive(Default)]
struct Responses {
    once: VecDeque<CommandOutput>,
    always: Option<CommandOutput>,
}

/// Scripted [`CommandRunner`] keyed by tool name (`blkid`, `mkfs.ext4`, `mount`, ...).
///
/// Tools without a script succeed with empty output. `mount` and the
/// mount-table listing share the tool name; tell them apart by scripting
/// with [`FakeCommandRunner::respond_once`] in call order.
#[derive(Default)]
pub struct FakeCommandRunner {
    responses: Mutex<HashMap<String, Responses>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl FakeCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call to `tool` with `output`.
    pub fn respond(self, tool: &str, output: CommandOutput) -> Self {
        self.responses.lock().entry(tool.to_owned()).or_default().always = Some(output);
        self
    }

    /// Answer the next unscripted call to `tool` with `output`.
    pub fn respond_once(self, tool: &str, output: CommandOutput) -> Self {
        self.responses
            .lock()
            .entry(tool.to_owned())
            .or_default()
            .once
            .push_back(output);
        self
    }

    /// Every invocation so far, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }

    /// Tool names of every invocation so far, in order.
    pub fn tools(&self) -> Vec<String> {
        self.invocations
            .lock()
            .iter()
            .map(|inv| inv.tool_name().to_owned())
            .collect()
    }

    pub fn calls_to(&self, tool: &str) -> usize {
        self.invocations
            .lock()
            .iter()
            .filter(|inv| inv.tool_name() == tool)
            .count()
    }
}

#[async_trait]
impl CommandRunner for FakeCommandRunner {
    async fn run(&self, invocation: &Invocation) -> EbsmountResult<CommandOutput> {
        self.invocations.lock().push(invocation.clone());

        let mut responses = self.responses.lock();
        let output = responses
            .get_mut(invocation.tool_name())
            .and_then(|r| r.once.pop_front().or_else(|| r.always.clone()))
            .unwrap_or_else(CommandOutput::success);
        Ok(output)
    }
}
