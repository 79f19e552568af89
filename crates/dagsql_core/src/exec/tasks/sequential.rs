use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use crate::context::Context;
use crate::errlist::ErrorList;
use crate::errors::{internal, ExecError, Result};
use crate::exec::message::{message_channel, MessageChan, MessageReceiver, MessageSender};
use crate::rel::{Task, TaskRunner};

/// A linear chain of tasks.
///
/// The output of each child is wired into the input of the next during
/// setup. The output of the chain is the output of the last child. All
/// children run concurrently.
#[derive(Debug)]
pub struct TaskSequential {
    name: String,
    children: Vec<Box<dyn TaskRunner>>,
    /// Output used when there are no children. Closed when run.
    empty_tx: Option<MessageSender>,
    empty_chan: MessageChan,
    closed: bool,
}

impl TaskSequential {
    pub fn new(
        ctx: &Arc<Context>,
        name: impl Into<String>,
        children: Vec<Box<dyn TaskRunner>>,
    ) -> Self {
        let (tx, chan) = message_channel(ctx.config().channel_buffer);
        TaskSequential {
            name: name.into(),
            children,
            empty_tx: Some(tx),
            empty_chan: chan,
            closed: false,
        }
    }
}

impl Task for TaskSequential {
    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> &[Box<dyn TaskRunner>] {
        &self.children
    }

    fn message_out(&self) -> MessageChan {
        match self.children.last() {
            Some(last) => last.message_out(),
            None => self.empty_chan.clone(),
        }
    }

    fn into_runner(self: Box<Self>) -> Result<Box<dyn TaskRunner>, Box<dyn Task>> {
        Ok(self)
    }
}

#[async_trait]
impl TaskRunner for TaskSequential {
    fn setup(&mut self, depth: usize) -> Result<()> {
        debug!(depth, task = %self.name, children = self.children.len(), "setting up task");

        for idx in 1..self.children.len() {
            let prev = &self.children[idx - 1];
            let rx = prev
                .message_out()
                .take()
                .ok_or_else(|| internal!("Output of '{}' already taken", prev.name()))?;
            self.children[idx].set_input(rx)?;
        }

        for child in &mut self.children {
            child.setup(depth + 1)?;
        }
        Ok(())
    }

    async fn run(&mut self) -> Result<()> {
        self.empty_tx = None;
        try_join_all(self.children.iter_mut().map(|c| c.run())).await?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            debug!(task = %self.name, "closing task");
            self.closed = true;
        }
        self.empty_tx = None;

        let mut errs = ErrorList::new();
        for child in &mut self.children {
            errs.append(child.close().err());
        }
        errs.into_result()
    }

    fn set_input(&mut self, input: MessageReceiver) -> Result<()> {
        match self.children.first_mut() {
            Some(first) => first.set_input(input),
            None => Err(ExecError::Plan(format!(
                "Task '{}' has no children to receive input",
                self.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::tasks::testutil::run_task;
    use crate::exec::tasks::{Filter, Values};
    use crate::expr::PhysicalExpr;
    use crate::scalar::{Row, ScalarValue};

    #[tokio::test]
    async fn chain_is_wired() {
        let ctx = Arc::new(Context::new("seq"));
        let values = Values::new(
            &ctx,
            vec![
                Row::new(vec![true.into()]),
                Row::new(vec![false.into()]),
                Row::new(vec![ScalarValue::Null]),
            ],
        );
        let filter = Filter::new(&ctx, PhysicalExpr::Column(0));
        let children: Vec<Box<dyn TaskRunner>> = vec![Box::new(values), Box::new(filter)];
        let mut seq = TaskSequential::new(&ctx, "seq", children);

        let rows = run_task(&ctx, &mut seq).await.unwrap();
        assert_eq!(vec![Row::new(vec![true.into()])], rows);
    }

    #[tokio::test]
    async fn empty_sequence_closes_output() {
        let ctx = Arc::new(Context::new("seq"));
        let mut seq = TaskSequential::new(&ctx, "seq", Vec::new());
        let rows = run_task(&ctx, &mut seq).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn close_is_repeatable() {
        let ctx = Arc::new(Context::new("seq"));
        let values = Values::new(&ctx, Vec::new());
        let mut seq =
            TaskSequential::new(&ctx, "seq", vec![Box::new(values) as Box<dyn TaskRunner>]);
        seq.close().unwrap();
        seq.close().unwrap();
    }
}
