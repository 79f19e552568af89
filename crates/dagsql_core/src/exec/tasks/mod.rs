//! Default task implementations created by `DefaultTaskPlanner`.
pub mod distinct;
pub mod filter;
pub mod group_by;
pub mod join;
pub mod mutation;
pub mod projection;
pub mod sequential;
pub mod source;
pub mod values;

pub use distinct::Distinct;
pub use filter::Filter;
pub use group_by::GroupBy;
pub use join::JoinMerge;
pub use mutation::{Mutation, MutationOp};
pub use projection::Projection;
pub use sequential::TaskSequential;
pub use source::Source;
pub use values::Values;

/// Implement `Task` for a task without children that keeps its handoffs in a
/// `base: TaskBase` field.
macro_rules! impl_leaf_task {
    ($ty:ty) => {
        impl $crate::rel::Task for $ty {
            fn name(&self) -> &str {
                &self.base.name
            }

            fn children(&self) -> &[Box<dyn $crate::rel::TaskRunner>] {
                &[]
            }

            fn message_out(&self) -> $crate::exec::message::MessageChan {
                self.base.message_out()
            }

            fn into_runner(
                self: Box<Self>,
            ) -> std::result::Result<Box<dyn $crate::rel::TaskRunner>, Box<dyn $crate::rel::Task>>
            {
                Ok(self)
            }
        }
    };
}
pub(crate) use impl_leaf_task;

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use crate::context::Context;
    use crate::errors::Result;
    use crate::exec::message::{message_channel, MessageReceiver};
    use crate::exec::runner::recv_all;
    use crate::rel::TaskRunner;
    use crate::scalar::Row;

    /// Input handoff already filled with the given rows and closed.
    pub(crate) async fn input_of(rows: Vec<Row>) -> MessageReceiver {
        let (tx, chan) = message_channel(rows.len());
        for (id, row) in rows.into_iter().enumerate() {
            tx.send(crate::exec::message::Message { id: id as u64, row })
                .await
                .unwrap();
        }
        chan.take().unwrap()
    }

    /// Setup and run a task to completion, collecting its output.
    pub(crate) async fn run_task(
        ctx: &Arc<Context>,
        task: &mut dyn TaskRunner,
    ) -> Result<Vec<Row>> {
        task.setup(0)?;
        let mut rx = task.message_out().take().unwrap();
        let (res, rows) = tokio::join!(task.run(), recv_all(ctx, &mut rx));
        task.close()?;
        res?;
        rows
    }
}
