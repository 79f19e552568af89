use std::sync::Arc;

use async_trait::async_trait;

use super::impl_leaf_task;
use crate::context::Context;
use crate::errors::Result;
use crate::exec::message::MessageReceiver;
use crate::exec::runner::{recv, run_spawned, TaskBase};
use crate::expr::PhysicalExpr;
use crate::rel::TaskRunner;
use crate::scalar::Row;

/// Evaluates the select list for every input row.
#[derive(Debug)]
pub struct Projection {
    base: TaskBase,
    exprs: Vec<PhysicalExpr>,
}

impl Projection {
    pub fn new(ctx: &Arc<Context>, exprs: Vec<PhysicalExpr>) -> Self {
        Projection {
            base: TaskBase::new("projection", ctx),
            exprs,
        }
    }
}

impl_leaf_task!(Projection);

#[async_trait]
impl TaskRunner for Projection {
    fn setup(&mut self, depth: usize) -> Result<()> {
        self.base.setup_with_input(depth)
    }

    async fn run(&mut self) -> Result<()> {
        let mut input = self.base.take_input()?;
        let mut emitter = self.base.emitter()?;
        let exprs = self.exprs.clone();
        let ctx = self.base.ctx.clone();

        run_spawned(&self.base.ctx, &self.base.name, async move {
            while let Some(msg) = recv(&ctx, &mut input).await? {
                let values = exprs
                    .iter()
                    .map(|expr| expr.eval(&msg.row))
                    .collect::<Result<Vec<_>>>()?;
                if !emitter.emit(Row::new(values)).await? {
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

    #[tokio::test]
    async fn reorders_columns() {
        let ctx = Arc::new(Context::new("projection"));
        let mut task = Projection::new(&ctx, vec![PhysicalExpr::Column(1), PhysicalExpr::Column(0)]);
        task.set_input(input_of(vec![Row::new(vec![1.into(), "a".into()])]).await)
            .unwrap();

        let rows = run_task(&ctx, &mut task).await.unwrap();
        assert_eq!(vec![Row::new(vec!["a".into(), 1.into()])], rows);
    }
}
