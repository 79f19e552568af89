use std::fmt::Debug;

use async_trait::async_trait;

use crate::errors::Result;
use crate::exec::message::{MessageChan, MessageReceiver};

/// Shape of a node in the task DAG.
///
/// A task owns its children and exactly one outbound handoff. Planning and
/// inspection only need this trait.
pub trait Task: Debug + Send {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Ordered children of this task.
    fn children(&self) -> &[Box<dyn TaskRunner>];

    /// Handle to the outbound handoff of this task.
    fn message_out(&self) -> MessageChan;

    /// Refine into a runnable task.
    ///
    /// Tasks that can't be run return themselves in the error.
    fn into_runner(self: Box<Self>) -> Result<Box<dyn TaskRunner>, Box<dyn Task>>;
}

/// A task that can be driven through its lifecycle.
///
/// `setup` is called exactly once before `run`. `close` may be called more
/// than once, and must be callable even if `setup` or `run` failed.
#[async_trait]
pub trait TaskRunner: Task {
    /// Recursively prepare this task and its children. `depth` is the
    /// distance from the root.
    fn setup(&mut self, depth: usize) -> Result<()>;

    /// Pull from the inbound handoff (or children), apply this task's
    /// operation and write to the outbound handoff. The outbound handoff is
    /// closed when this returns.
    async fn run(&mut self) -> Result<()>;

    /// Release any resources held.
    fn close(&mut self) -> Result<()>;

    /// Connect the outbound handoff of the previous task in a chain to this
    /// task.
    fn set_input(&mut self, input: MessageReceiver) -> Result<()>;
}
