use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use super::impl_leaf_task;
use crate::context::Context;
use crate::errors::Result;
use crate::exec::message::MessageReceiver;
use crate::exec::runner::{recv, run_spawned, TaskBase};
use crate::expr::aggregate::Accumulator;
use crate::expr::{AggregateExpr, PhysicalExpr};
use crate::rel::TaskRunner;
use crate::scalar::Row;

/// Hash aggregate.
///
/// Output rows are the group key values followed by the aggregate results,
/// one row per group in order of first appearance. Without group keys a
/// single row is always emitted, even for empty input.
#[derive(Debug)]
pub struct GroupBy {
    base: TaskBase,
    keys: Vec<PhysicalExpr>,
    aggregates: Vec<AggregateExpr>,
}

impl GroupBy {
    pub fn new(ctx: &Arc<Context>, keys: Vec<PhysicalExpr>, aggregates: Vec<AggregateExpr>) -> Self {
        GroupBy {
            base: TaskBase::new("group_by", ctx),
            keys,
            aggregates,
        }
    }
}

impl_leaf_task!(GroupBy);

#[async_trait]
impl TaskRunner for GroupBy {
    fn setup(&mut self, depth: usize) -> Result<()> {
        self.base.setup_with_input(depth)
    }

    async fn run(&mut self) -> Result<()> {
        let mut input = self.base.take_input()?;
        let mut emitter = self.base.emitter()?;
        let keys = self.keys.clone();
        let aggregates = self.aggregates.clone();
        let ctx = self.base.ctx.clone();

        run_spawned(&self.base.ctx, &self.base.name, async move {
            let new_accumulators =
                || -> Vec<Accumulator> { aggregates.iter().map(|a| a.accumulator()).collect() };

            let mut groups: IndexMap<Row, Vec<Accumulator>> = IndexMap::new();
            if keys.is_empty() {
                groups.insert(Row::empty(), new_accumulators());
            }

            while let Some(msg) = recv(&ctx, &mut input).await? {
                let key = keys
                    .iter()
                    .map(|k| k.eval(&msg.row))
                    .collect::<Result<Vec<_>>>()
                    .map(Row::new)?;

                let accs = groups.entry(key).or_insert_with(new_accumulators);
                for (agg, acc) in aggregates.iter().zip(accs.iter_mut()) {
                    agg.update(acc, &msg.row)?;
                }
            }

            for (key, accs) in groups {
                let mut values = key.0;
                values.extend(accs.into_iter().map(|acc| acc.finish()));
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
    use crate::expr::AggregateFunction;
    use crate::scalar::ScalarValue;

    fn count_star() -> AggregateExpr {
        AggregateExpr {
            func: AggregateFunction::Count,
            arg: None,
            display: "count(*)".to_string(),
        }
    }

    fn sum_col(idx: usize) -> AggregateExpr {
        AggregateExpr {
            func: AggregateFunction::Sum,
            arg: Some(PhysicalExpr::Column(idx)),
            display: "sum(v)".to_string(),
        }
    }

    #[tokio::test]
    async fn groups_in_first_seen_order() {
        let ctx = Arc::new(Context::new("group"));
        let mut task = GroupBy::new(
            &ctx,
            vec![PhysicalExpr::Column(0)],
            vec![count_star(), sum_col(1)],
        );
        task.set_input(
            input_of(vec![
                Row::new(vec!["b".into(), 1.into()]),
                Row::new(vec!["a".into(), 2.into()]),
                Row::new(vec!["b".into(), 3.into()]),
            ])
            .await,
        )
        .unwrap();

        let rows = run_task(&ctx, &mut task).await.unwrap();
        assert_eq!(
            vec![
                Row::new(vec!["b".into(), 2.into(), 4.into()]),
                Row::new(vec!["a".into(), 1.into(), 2.into()]),
            ],
            rows
        );
    }

    #[tokio::test]
    async fn no_keys_empty_input() {
        let ctx = Arc::new(Context::new("group"));
        let mut task = GroupBy::new(&ctx, Vec::new(), vec![count_star(), sum_col(0)]);
        task.set_input(input_of(Vec::new()).await).unwrap();

        let rows = run_task(&ctx, &mut task).await.unwrap();
        assert_eq!(
            vec![Row::new(vec![ScalarValue::Int64(0), ScalarValue::Null])],
            rows
        );
    }
}
