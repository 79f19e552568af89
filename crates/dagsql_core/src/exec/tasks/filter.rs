use std::sync::Arc;

use async_trait::async_trait;

use super::impl_leaf_task;
use crate::context::Context;
use crate::errors::Result;
use crate::exec::message::MessageReceiver;
use crate::exec::runner::{recv, run_spawned, TaskBase};
use crate::expr::PhysicalExpr;
use crate::rel::TaskRunner;

/// Passes through rows the predicate evaluates to true for. Used for both
/// WHERE and HAVING.
#[derive(Debug)]
pub struct Filter {
    base: TaskBase,
    predicate: PhysicalExpr,
}

impl Filter {
    pub fn new(ctx: &Arc<Context>, predicate: PhysicalExpr) -> Self {
        Filter {
            base: TaskBase::new("filter", ctx),
            predicate,
        }
    }
}

impl_leaf_task!(Filter);

#[async_trait]
impl TaskRunner for Filter {
    fn setup(&mut self, depth: usize) -> Result<()> {
        self.base.setup_with_input(depth)
    }

    async fn run(&mut self) -> Result<()> {
        let mut input = self.base.take_input()?;
        let mut emitter = self.base.emitter()?;
        let predicate = self.predicate.clone();
        let ctx = self.base.ctx.clone();

        run_spawned(&self.base.ctx, &self.base.name, async move {
            while let Some(msg) = recv(&ctx, &mut input).await? {
                if predicate.eval_predicate(&msg.row)? && !emitter.emit(msg.row).await? {
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
    use dagsql_parser::ast::BinaryOperator;

    use super::*;
    use crate::exec::tasks::testutil::{input_of, run_task};
    use crate::scalar::{Row, ScalarValue};

    #[tokio::test]
    async fn keeps_matching_rows() {
        let ctx = Arc::new(Context::new("filter"));
        let predicate = PhysicalExpr::Binary {
            left: Box::new(PhysicalExpr::Column(0)),
            op: BinaryOperator::Gt,
            right: Box::new(PhysicalExpr::Literal(ScalarValue::Int64(1))),
        };
        let mut task = Filter::new(&ctx, predicate);
        task.set_input(
            input_of(vec![
                Row::new(vec![1.into()]),
                Row::new(vec![ScalarValue::Null]),
                Row::new(vec![3.into()]),
            ])
            .await,
        )
        .unwrap();

        let rows = run_task(&ctx, &mut task).await.unwrap();
        assert_eq!(vec![Row::new(vec![3.into()])], rows);
    }

    #[tokio::test]
    async fn setup_requires_input() {
        let ctx = Arc::new(Context::new("filter"));
        let mut task = Filter::new(&ctx, PhysicalExpr::Literal(true.into()));
        task.setup(0).unwrap_err();
    }
}
