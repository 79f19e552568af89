use std::sync::Arc;

use async_trait::async_trait;
use hashbrown::HashSet;

use super::impl_leaf_task;
use crate::context::Context;
use crate::errors::Result;
use crate::exec::message::MessageReceiver;
use crate::exec::runner::{recv, run_spawned, TaskBase};
use crate::rel::TaskRunner;

/// Drops rows that were already emitted. Order of first occurrence is kept.
#[derive(Debug)]
pub struct Distinct {
    base: TaskBase,
}

impl Distinct {
    pub fn new(ctx: &Arc<Context>) -> Self {
        Distinct {
            base: TaskBase::new("distinct", ctx),
        }
    }
}

impl_leaf_task!(Distinct);

#[async_trait]
impl TaskRunner for Distinct {
    fn setup(&mut self, depth: usize) -> Result<()> {
        self.base.setup_with_input(depth)
    }

    async fn run(&mut self) -> Result<()> {
        let mut input = self.base.take_input()?;
        let mut emitter = self.base.emitter()?;
        let ctx = self.base.ctx.clone();

        run_spawned(&self.base.ctx, &self.base.name, async move {
            let mut seen = HashSet::new();
            while let Some(msg) = recv(&ctx, &mut input).await? {
                if seen.contains(&msg.row) {
                    continue;
                }
                seen.insert(msg.row.clone());
                if !emitter.emit(msg.row).await? {
                    break;
                }
            }
            Ok(())
        })
        .await
    }

    fn close(&mut self) -> Result<()> {
        self.base.close();
        Ok(())
    }

    fn set_input(&mut self, input: MessageReceiver) -> Result<()> {
        self.base.set_input(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::tasks::testutil::{input_of, run_task};
    use crate::scalar::Row;

    #[tokio::test]
    async fn first_occurrence_kept() {
        let ctx = Arc::new(Context::new("distinct"));
        let mut task = Distinct::new(&ctx);
        task.set_input(
            input_of(vec![
                Row::new(vec!["b".into()]),
                Row::new(vec!["a".into()]),
                Row::new(vec!["b".into()]),
            ])
            .await,
        )
        .unwrap();

        let rows = run_task(&ctx, &mut task).await.unwrap();
        assert_eq!(
            vec![Row::new(vec!["b".into()]), Row::new(vec!["a".into()])],
            rows
        );
    }
}
