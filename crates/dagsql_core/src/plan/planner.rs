use std::fmt::Debug;
use std::sync::Arc;

use dagsql_parser::ast::JoinType;

use crate::context::Context;
use crate::errors::{ExecError, Result};
use crate::exec::tasks::{
    Distinct, Filter, GroupBy, JoinMerge, Mutation, MutationOp, Projection, Source,
    TaskSequential, Values,
};
use crate::expr::{AggregateExpr, PhysicalExpr};
use crate::rel::{Task, TaskRunner};
use crate::scalar::Row;
use crate::schema::Scanner;

/// Creates the concrete tasks a job is compiled into.
///
/// Backends plug in their own operators by providing an implementation of
/// this trait on the context.
pub trait TaskPlanner: Debug + Sync + Send {
    /// Chain of tasks, each feeding the next.
    fn sequential(
        &self,
        ctx: &Arc<Context>,
        name: &str,
        children: Vec<Box<dyn Task>>,
    ) -> Result<Box<dyn Task>>;

    fn source(
        &self,
        ctx: &Arc<Context>,
        binding: &str,
        scanner: Arc<dyn Scanner>,
    ) -> Result<Box<dyn Task>>;

    fn values(&self, ctx: &Arc<Context>, rows: Vec<Row>) -> Result<Box<dyn Task>>;

    fn filter(&self, ctx: &Arc<Context>, predicate: PhysicalExpr) -> Result<Box<dyn Task>>;

    fn projection(&self, ctx: &Arc<Context>, exprs: Vec<PhysicalExpr>) -> Result<Box<dyn Task>>;

    fn group_by(
        &self,
        ctx: &Arc<Context>,
        keys: Vec<PhysicalExpr>,
        aggregates: Vec<AggregateExpr>,
    ) -> Result<Box<dyn Task>>;

    fn distinct(&self, ctx: &Arc<Context>) -> Result<Box<dyn Task>>;

    fn join(
        &self,
        ctx: &Arc<Context>,
        join_type: JoinType,
        left: Box<dyn Task>,
        right: Box<dyn Task>,
        on: PhysicalExpr,
        right_width: usize,
    ) -> Result<Box<dyn Task>>;

    fn insert(
        &self,
        ctx: &Arc<Context>,
        scanner: Arc<dyn Scanner>,
        columns: Vec<usize>,
    ) -> Result<Box<dyn Task>>;

    fn upsert(
        &self,
        ctx: &Arc<Context>,
        scanner: Arc<dyn Scanner>,
        columns: Vec<usize>,
    ) -> Result<Box<dyn Task>>;

    fn update(
        &self,
        ctx: &Arc<Context>,
        scanner: Arc<dyn Scanner>,
        assignments: Vec<(usize, PhysicalExpr)>,
        filter: Option<PhysicalExpr>,
    ) -> Result<Box<dyn Task>>;

    fn delete(
        &self,
        ctx: &Arc<Context>,
        scanner: Arc<dyn Scanner>,
        filter: Option<PhysicalExpr>,
    ) -> Result<Box<dyn Task>>;
}

/// Refine a task into a runner, failing if it doesn't support the lifecycle.
pub fn into_runner(task: Box<dyn Task>) -> Result<Box<dyn TaskRunner>> {
    task.into_runner().map_err(|task| ExecError::NotTaskRunner {
        task: task.name().to_string(),
    })
}

/// Planner creating the in-memory tasks in `exec::tasks`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTaskPlanner;

impl TaskPlanner for DefaultTaskPlanner {
    fn sequential(
        &self,
        ctx: &Arc<Context>,
        name: &str,
        children: Vec<Box<dyn Task>>,
    ) -> Result<Box<dyn Task>> {
        let children = children
            .into_iter()
            .map(into_runner)
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(TaskSequential::new(ctx, name, children)))
    }

    fn source(
        &self,
        ctx: &Arc<Context>,
        binding: &str,
        scanner: Arc<dyn Scanner>,
    ) -> Result<Box<dyn Task>> {
        Ok(Box::new(Source::new(ctx, binding, scanner)))
    }

    fn values(&self, ctx: &Arc<Context>, rows: Vec<Row>) -> Result<Box<dyn Task>> {
        Ok(Box::new(Values::new(ctx, rows)))
    }

    fn filter(&self, ctx: &Arc<Context>, predicate: PhysicalExpr) -> Result<Box<dyn Task>> {
        Ok(Box::new(Filter::new(ctx, predicate)))
    }

    fn projection(&self, ctx: &Arc<Context>, exprs: Vec<PhysicalExpr>) -> Result<Box<dyn Task>> {
        Ok(Box::new(Projection::new(ctx, exprs)))
    }

    fn group_by(
        &self,
        ctx: &Arc<Context>,
        keys: Vec<PhysicalExpr>,
        aggregates: Vec<AggregateExpr>,
    ) -> Result<Box<dyn Task>> {
        Ok(Box::new(GroupBy::new(ctx, keys, aggregates)))
    }

    fn distinct(&self, ctx: &Arc<Context>) -> Result<Box<dyn Task>> {
        Ok(Box::new(Distinct::new(ctx)))
    }

    fn join(
        &self,
        ctx: &Arc<Context>,
        join_type: JoinType,
        left: Box<dyn Task>,
        right: Box<dyn Task>,
        on: PhysicalExpr,
        right_width: usize,
    ) -> Result<Box<dyn Task>> {
        Ok(Box::new(JoinMerge::new(
            ctx,
            join_type,
            into_runner(left)?,
            into_runner(right)?,
            on,
            right_width,
        )))
    }

    fn insert(
        &self,
        ctx: &Arc<Context>,
        scanner: Arc<dyn Scanner>,
        columns: Vec<usize>,
    ) -> Result<Box<dyn Task>> {
        Ok(Box::new(Mutation::new(
            ctx,
            scanner,
            MutationOp::Insert { columns },
        )))
    }

    fn upsert(
        &self,
        ctx: &Arc<Context>,
        scanner: Arc<dyn Scanner>,
        columns: Vec<usize>,
    ) -> Result<Box<dyn Task>> {
        Ok(Box::new(Mutation::new(
            ctx,
            scanner,
            MutationOp::Upsert { columns },
        )))
    }

    fn update(
        &self,
        ctx: &Arc<Context>,
        scanner: Arc<dyn Scanner>,
        assignments: Vec<(usize, PhysicalExpr)>,
        filter: Option<PhysicalExpr>,
    ) -> Result<Box<dyn Task>> {
        Ok(Box::new(Mutation::new(
            ctx,
            scanner,
            MutationOp::Update {
                assignments,
                filter,
            },
        )))
    }

    fn delete(
        &self,
        ctx: &Arc<Context>,
        scanner: Arc<dyn Scanner>,
        filter: Option<PhysicalExpr>,
    ) -> Result<Box<dyn Task>> {
        Ok(Box::new(Mutation::new(
            ctx,
            scanner,
            MutationOp::Delete { filter },
        )))
    }
}
