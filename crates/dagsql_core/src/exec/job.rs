use std::fmt;
use std::mem;
use std::sync::Arc;

use async_trait::async_trait;
use dagsql_parser::ast::{
    BinaryOperator, CommandNode, DeleteNode, DescribeNode, Expr, FromNode, InsertNode, JoinType,
    ObjectReference, PrepareNode, SelectExpr, SelectNode, ShowNode, UpdateNode,
};
use dagsql_parser::statement::Statement;
use tracing::{debug, trace, warn};

use crate::context::Context;
use crate::errlist::ErrorList;
use crate::errors::{internal, plan_err, ExecError, Result};
use crate::exec::message::MessageChan;
use crate::exec::runner::recv_all;
use crate::exec::source::SourceBuilder;
use crate::expr::{output_name, AggregateExpr, PhysicalExpr};
use crate::plan::layout::{ColumnLayout, LayoutColumn};
use crate::plan::planner::into_runner;
use crate::plan::{resolve_table, SourcePlan};
use crate::rel::{Accept, SourceVisitor, Task, TaskRunner, VisitResult, VisitStatus, Visitor};
use crate::scalar::Row;

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Compiled,
    SetUp,
    Running,
    Finished,
    Failed,
    Closed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Compiled => "compiled",
            Self::SetUp => "set up",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle of a compiled job.
#[async_trait]
pub trait JobRunner: Send {
    /// Wire up the task tree. Must be called once, after compilation.
    fn setup(&mut self) -> Result<()>;

    /// Run every task to completion.
    async fn run(&mut self) -> Result<()>;

    /// Release all resources. Safe to call more than once.
    fn close(&mut self) -> Result<()>;
}

/// Compiles a single SQL statement into a tree of tasks and drives that tree
/// through setup, run and close.
///
/// The builder is also the default `Visitor`. An override visitor may be
/// provided which gets the first chance at compiling every statement,
/// deferring to the builder by returning `(None, Continue)`.
pub struct JobBuilder {
    ctx: Arc<Context>,
    visitor: Option<Box<dyn Visitor>>,
    root: Option<Box<dyn TaskRunner>>,
    state: JobState,

    // State local to compiling the current statement.
    distinct: bool,
    children: Vec<Box<dyn Task>>,
    layout: ColumnLayout,
}

impl fmt::Debug for JobBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobBuilder")
            .field("raw", &self.ctx.raw())
            .field("state", &self.state)
            .field("has_override", &self.visitor.is_some())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl JobBuilder {
    pub fn new(ctx: Arc<Context>, visitor: Option<Box<dyn Visitor>>) -> Self {
        JobBuilder {
            ctx,
            visitor,
            root: None,
            state: JobState::Created,
            distinct: false,
            children: Vec::new(),
            layout: ColumnLayout::empty(),
        }
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Root of the compiled task tree.
    pub fn root(&self) -> Option<&dyn TaskRunner> {
        self.root.as_deref()
    }

    /// Columns produced by the job. Only known for statements compiled by
    /// the builder itself.
    pub fn output_layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// Parse the raw SQL on the context and compile it into a root task.
    pub fn compile(&mut self) -> Result<()> {
        if self.state != JobState::Created {
            return Err(ExecError::InvalidLifecycle {
                expected: JobState::Created,
                actual: self.state,
            });
        }

        let raw = self.ctx.raw().to_string();
        let mut statements = dagsql_parser::parse(&raw).inspect_err(|e| {
            debug!(%raw, error = %e, "failed to parse statement");
        })?;

        let statement = match statements.len() {
            0 => return Err(ExecError::NoStatement { raw }),
            1 => Arc::new(statements.remove(0)),
            n => return Err(ExecError::MultipleStatements(n)),
        };
        self.ctx.set_statement(statement.clone());

        if self.ctx.schema().is_none() {
            warn!(%raw, "no schema selected, statements referencing tables will fail");
        }

        debug!(kind = statement.kind(), has_override = self.visitor.is_some(), "compiling statement");
        let (task, _) = self.dispatch(&statement)?;
        let task = task.ok_or(ExecError::NoTaskFound { raw })?;
        let root = into_runner(task)?;

        trace!(root = %root.name(), "compiled root task");
        self.root = Some(root);
        self.state = JobState::Compiled;
        Ok(())
    }

    /// Hand the statement to the override visitor, falling back to the
    /// builder when the override doesn't produce a task.
    fn dispatch(&mut self, statement: &Statement) -> VisitResult {
        let result = match self.try_override(|v| statement.accept(v))? {
            Some(result) => result,
            None => statement.accept(self)?,
        };
        check_status(statement.kind(), result)
    }

    /// Give the override visitor the first chance at a compile step.
    ///
    /// Returns `None` if there's no override or it deferred with
    /// `(None, Continue)`.
    fn try_override<F>(&mut self, step: F) -> Result<Option<(Option<Box<dyn Task>>, VisitStatus)>>
    where
        F: FnOnce(&mut dyn Visitor) -> VisitResult,
    {
        let mut visitor = match self.visitor.take() {
            Some(visitor) => visitor,
            None => return Ok(None),
        };
        let result = step(visitor.as_mut());
        self.visitor = Some(visitor);
        match result? {
            (None, VisitStatus::Continue) => {
                trace!("override deferred to default visitor");
                Ok(None)
            }
            other => Ok(Some(other)),
        }
    }

    /// Compile one clause of a select, override first.
    fn visit_step<F>(&mut self, clause: &str, step: F) -> VisitResult
    where
        F: Fn(&mut dyn Visitor) -> VisitResult,
    {
        let result = match self.try_override(&step)? {
            Some(result) => result,
            None => {
                let this: &mut dyn Visitor = &mut *self;
                step(this)?
            }
        };
        check_status(clause, result)
    }

    pub fn setup(&mut self) -> Result<()> {
        let root = self.root.as_mut().ok_or(ExecError::NoRootTask)?;
        if self.state != JobState::Compiled {
            return Err(ExecError::InvalidLifecycle {
                expected: JobState::Compiled,
                actual: self.state,
            });
        }

        debug!(root = %root.name(), "setting up job");
        match root.setup(0) {
            Ok(()) => {
                self.state = JobState::SetUp;
                Ok(())
            }
            Err(e) => {
                self.state = JobState::Failed;
                Err(e)
            }
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let root = self.root.as_mut().ok_or(ExecError::NoRootTask)?;
        if self.state != JobState::SetUp {
            return Err(ExecError::InvalidLifecycle {
                expected: JobState::SetUp,
                actual: self.state,
            });
        }

        debug!(disable_recover = self.ctx.recovery_disabled(), "running job");
        self.state = JobState::Running;
        let result = root.run().await;
        match &result {
            Ok(()) => {
                debug!("job finished");
                self.state = JobState::Finished;
            }
            Err(e) => {
                debug!(error = %e, "job failed");
                self.state = JobState::Failed;
            }
        }
        result
    }

    pub fn close(&mut self) -> Result<()> {
        if self.state == JobState::Closed {
            return Ok(());
        }
        let result = match self.root.as_mut() {
            Some(root) => root.close(),
            None => Ok(()),
        };
        debug!("closed job");
        self.state = JobState::Closed;
        result
    }

    /// Output handoff of the job, the output of the last child of the root.
    pub fn drain_chan(&self) -> Result<MessageChan> {
        let root = self.root.as_ref().ok_or(ExecError::NoRootTask)?;
        let last = root.children().last().ok_or(ExecError::EmptyRoot)?;
        Ok(last.message_out())
    }

    /// Signal every task of the job to stop.
    pub fn shutdown(&self) {
        self.ctx.shutdown();
    }

    /// Run the job, collecting everything sent to the drain.
    ///
    /// The job must be set up.
    pub async fn collect(&mut self) -> Result<Vec<Row>> {
        if self.state != JobState::SetUp {
            return Err(ExecError::InvalidLifecycle {
                expected: JobState::SetUp,
                actual: self.state,
            });
        }
        let mut rx = self
            .drain_chan()?
            .take()
            .ok_or_else(|| internal!("Drain of job already taken"))?;

        let ctx = self.ctx.clone();
        let result = futures::try_join!(self.run(), recv_all(&ctx, &mut rx));
        match result {
            Ok(((), rows)) => Ok(rows),
            Err(e) => {
                if self.state == JobState::Running {
                    self.state = JobState::Failed;
                }
                Err(e)
            }
        }
    }

    fn reset(&mut self) {
        self.distinct = false;
        self.children.clear();
        self.layout = ColumnLayout::empty();
    }

    fn push(&mut self, task: Option<Box<dyn Task>>) {
        if let Some(task) = task {
            self.children.push(task);
        }
    }

    /// Compile every source of a FROM with joins, folding them left to right
    /// into join tasks.
    ///
    /// For inner joins, parts of `filter` referencing a single source are
    /// compiled into that source. Returns the part of the filter that still
    /// needs to be applied to the joined rows.
    fn compile_joins(&mut self, from: &FromNode, filter: Option<&Expr>) -> Result<Option<Expr>> {
        let mut errs = ErrorList::new();
        let mut plans = Vec::new();
        for table in from.sources() {
            if let Some(plan) = errs.append_result(SourcePlan::resolve(&self.ctx, table)) {
                plans.push(plan);
            }
        }
        errs.into_result()?;

        let inner_only = from
            .joins
            .iter()
            .all(|join| matches!(join.join_type, JoinType::Inner));
        let residual = match filter {
            Some(filter) if inner_only => push_down_filter(filter, &mut plans),
            other => other.cloned(),
        };

        let mut errs = ErrorList::new();
        let mut sides = Vec::with_capacity(plans.len());
        for (plan, table) in plans.into_iter().zip(from.sources()) {
            let scanner = plan.scanner.clone();
            let layout = plan.layout.clone();
            let mut builder = SourceBuilder::new(&self.ctx, plan);
            match errs.append_result(builder.visit_source_join(scanner)) {
                Some((Some(task), _)) => sides.push((task, layout)),
                Some((None, _)) => errs.append(Some(ExecError::NoTaskFound {
                    raw: table.to_string(),
                })),
                None => (),
            }
        }
        errs.into_result()?;

        let planner = self.ctx.planner().clone();
        let mut sides = sides.into_iter();
        let (mut task, mut layout) = sides
            .next()
            .ok_or_else(|| internal!("FROM without any sources"))?;
        for (join, (right, right_layout)) in from.joins.iter().zip(sides) {
            let joined = layout.concat(&right_layout);
            let on = PhysicalExpr::bind(&join.on, &joined)?;
            task = planner.join(
                &self.ctx,
                join.join_type,
                task,
                right,
                on,
                right_layout.len(),
            )?;
            layout = joined;
        }

        self.children.push(task);
        self.layout = layout;
        Ok(residual)
    }

    fn compile_insert(&mut self, insert: &InsertNode, upsert: bool) -> VisitResult {
        self.reset();
        let scanner = resolve_table(&self.ctx, &insert.table)?;
        let schema = scanner.table_schema();

        let columns = if insert.columns.is_empty() {
            (0..schema.columns.len()).collect::<Vec<_>>()
        } else {
            let mut columns = Vec::with_capacity(insert.columns.len());
            for ident in &insert.columns {
                let name = ident.normalized();
                let idx = schema
                    .column_index(&name)
                    .ok_or_else(|| ExecError::ColumnNotFound {
                        column: name.clone(),
                    })?;
                if columns.contains(&idx) {
                    return Err(plan_err!("Column '{name}' specified more than once"));
                }
                columns.push(idx);
            }
            columns
        };
        if upsert && !columns.contains(&0) {
            let key = schema.columns.first().map(|c| c.name.as_str()).unwrap_or("");
            return Err(plan_err!("UPSERT requires a value for key column '{key}'"));
        }

        let empty = Row::empty();
        let mut rows = Vec::with_capacity(insert.values.len());
        for values in &insert.values {
            if values.len() != columns.len() {
                return Err(plan_err!(
                    "INSERT has {} values but {} columns",
                    values.len(),
                    columns.len()
                ));
            }
            let row = values
                .iter()
                .map(|v| PhysicalExpr::bind_constant(v)?.eval(&empty))
                .collect::<Result<Vec<_>>>()?;
            rows.push(Row::new(row));
        }

        let planner = self.ctx.planner().clone();
        let values = planner.values(&self.ctx, rows)?;
        let (name, mutation) = if upsert {
            ("upsert", planner.upsert(&self.ctx, scanner, columns)?)
        } else {
            ("insert", planner.insert(&self.ctx, scanner, columns)?)
        };
        let task = planner.sequential(&self.ctx, name, vec![values, mutation])?;
        self.layout = count_layout();
        Ok((Some(task), VisitStatus::Final))
    }

    /// Bind an optional filter against the columns of a single table.
    fn bind_table_filter(
        &self,
        reference: &ObjectReference,
        filter: Option<&Expr>,
    ) -> Result<(ColumnLayout, Option<PhysicalExpr>)> {
        let scanner = resolve_table(&self.ctx, reference)?;
        let binding = reference
            .base()
            .map(|b| b.normalized())
            .unwrap_or_default();
        let layout = ColumnLayout::from_table(&binding, scanner.table_schema());
        let filter = filter
            .map(|f| PhysicalExpr::bind(f, &layout))
            .transpose()?;
        Ok((layout, filter))
    }
}

/// Reject statuses a visitor must never return.
fn check_status(what: &str, result: (Option<Box<dyn Task>>, VisitStatus)) -> VisitResult {
    match result.1 {
        VisitStatus::Unknown => Err(internal!("Visitor returned unknown status for {what}")),
        VisitStatus::Error => Err(internal!(
            "Visitor returned error status without an error for {what}"
        )),
        _ => Ok(result),
    }
}

/// Split a predicate into its AND-ed parts.
fn conjuncts(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::BinaryExpr {
            left,
            op: BinaryOperator::And,
            right,
        } => {
            let mut parts = conjuncts(left);
            parts.extend(conjuncts(right));
            parts
        }
        Expr::Nested(inner) => conjuncts(inner),
        other => vec![other],
    }
}

fn conjoin(exprs: Vec<Expr>) -> Option<Expr> {
    exprs.into_iter().reduce(|left, right| Expr::BinaryExpr {
        left: Box::new(left),
        op: BinaryOperator::And,
        right: Box::new(right),
    })
}

/// Move the parts of `filter` that only reference a single source into that
/// source's plan, returning what has to be applied after the join.
fn push_down_filter(filter: &Expr, plans: &mut [SourcePlan]) -> Option<Expr> {
    let mut pushed = vec![Vec::new(); plans.len()];
    let mut residual = Vec::new();
    for part in conjuncts(filter) {
        let mut bound = plans
            .iter()
            .enumerate()
            .filter(|(_, plan)| PhysicalExpr::bind(part, &plan.layout).is_ok())
            .map(|(idx, _)| idx);
        match (bound.next(), bound.next()) {
            (Some(idx), None) => pushed[idx].push(part.clone()),
            _ => residual.push(part.clone()),
        }
    }
    for (plan, exprs) in plans.iter_mut().zip(pushed) {
        if !exprs.is_empty() {
            trace!(binding = %plan.binding, parts = exprs.len(), "pushed filter into join side");
        }
        plan.filter = conjoin(exprs);
    }
    conjoin(residual)
}

fn count_layout() -> ColumnLayout {
    ColumnLayout::new(vec![LayoutColumn::new(None, "count")])
}

/// Column produced by a bound expression, keeping the source column's
/// qualification for plain references.
fn column_for(
    expr: &Expr,
    bound: &PhysicalExpr,
    layout: &ColumnLayout,
) -> Result<LayoutColumn> {
    match (expr, bound) {
        (Expr::Ident(_) | Expr::CompoundIdent(_), PhysicalExpr::Column(idx)) => layout
            .columns
            .get(*idx)
            .cloned()
            .ok_or_else(|| internal!("Column {idx} missing from layout")),
        _ => Ok(LayoutColumn::new(None, output_name(expr))),
    }
}

impl Visitor for JobBuilder {
    fn visit_prepared_stmt(&mut self, _stmt: &PrepareNode) -> VisitResult {
        Err(ExecError::NotImplemented {
            statement: "PREPARE",
        })
    }

    fn visit_select(&mut self, select: &SelectNode) -> VisitResult {
        self.reset();
        self.distinct = select.distinct;
        let planner = self.ctx.planner().clone();
        let where_expr = select.where_expr.as_ref();

        match &select.from {
            None => {
                let values = planner.values(&self.ctx, vec![Row::empty()])?;
                self.children.push(values);
                let (filter, _) = self.visit_step("WHERE", |v| v.visit_where(where_expr))?;
                self.push(filter);
            }
            Some(from) => {
                // A WHERE compiled by the override is applied as is, nothing
                // is pushed into the sources.
                let override_filter = self.try_override(|v| v.visit_where(where_expr))?;
                let source_filter = match override_filter {
                    Some(_) => None,
                    None => where_expr,
                };

                let residual = if from.joins.is_empty() {
                    let mut plan = SourcePlan::resolve(&self.ctx, &from.source)?;
                    plan.filter = source_filter.cloned();
                    self.layout = plan.layout.clone();
                    let mut builder = SourceBuilder::new(&self.ctx, plan);
                    let (task, _) = builder.visit_source_select()?;
                    let task = task.ok_or_else(|| ExecError::NoTaskFound {
                        raw: from.source.to_string(),
                    })?;
                    self.children.push(task);
                    None
                } else {
                    self.compile_joins(from, source_filter)?
                };

                let (filter, _) = match override_filter {
                    Some(result) => check_status("WHERE", result)?,
                    None => self.visit_where(residual.as_ref())?,
                };
                self.push(filter);
            }
        }

        // The builder's own clause steps keep the output layout current. An
        // override producing a clause is responsible for its columns.
        let (group_by, _) = self.visit_step("GROUP BY", |v| v.visit_group_by(select))?;
        self.push(group_by);
        let (having, _) = self.visit_step("HAVING", |v| v.visit_having(select.having.as_ref()))?;
        self.push(having);
        let (projection, _) =
            self.visit_step("projection", |v| v.visit_projection(&select.projections))?;
        self.push(projection);
        if self.distinct {
            let distinct = planner.distinct(&self.ctx)?;
            self.children.push(distinct);
        }

        let children = mem::take(&mut self.children);
        let task = planner.sequential(&self.ctx, "select", children)?;
        Ok((Some(task), VisitStatus::Final))
    }

    fn visit_insert(&mut self, insert: &InsertNode) -> VisitResult {
        self.compile_insert(insert, false)
    }

    fn visit_upsert(&mut self, upsert: &InsertNode) -> VisitResult {
        self.compile_insert(upsert, true)
    }

    fn visit_update(&mut self, update: &UpdateNode) -> VisitResult {
        self.reset();
        let (layout, filter) = self.bind_table_filter(&update.table, update.where_expr.as_ref())?;
        let mut assignments = Vec::with_capacity(update.assignments.len());
        for assignment in &update.assignments {
            let idx = layout.resolve(None, &assignment.column.normalized())?;
            let value = PhysicalExpr::bind(&assignment.value, &layout)?;
            assignments.push((idx, value));
        }

        let planner = self.ctx.planner().clone();
        let scanner = resolve_table(&self.ctx, &update.table)?;
        let task = planner.update(&self.ctx, scanner, assignments, filter)?;
        let task = planner.sequential(&self.ctx, "update", vec![task])?;
        self.layout = count_layout();
        Ok((Some(task), VisitStatus::Final))
    }

    fn visit_delete(&mut self, delete: &DeleteNode) -> VisitResult {
        self.reset();
        let (_, filter) = self.bind_table_filter(&delete.table, delete.where_expr.as_ref())?;

        let planner = self.ctx.planner().clone();
        let scanner = resolve_table(&self.ctx, &delete.table)?;
        let task = planner.delete(&self.ctx, scanner, filter)?;
        let task = planner.sequential(&self.ctx, "delete", vec![task])?;
        self.layout = count_layout();
        Ok((Some(task), VisitStatus::Final))
    }

    fn visit_show(&mut self, _show: &ShowNode) -> VisitResult {
        Err(ExecError::NotImplemented { statement: "SHOW" })
    }

    fn visit_describe(&mut self, _describe: &DescribeNode) -> VisitResult {
        Err(ExecError::NotImplemented {
            statement: "DESCRIBE",
        })
    }

    fn visit_command(&mut self, _command: &CommandNode) -> VisitResult {
        Err(ExecError::NotImplemented {
            statement: "COMMAND",
        })
    }

    fn visit_into(&mut self, _target: &ObjectReference, _select: &SelectNode) -> VisitResult {
        Err(ExecError::NotImplemented { statement: "INTO" })
    }

    fn visit_where(&mut self, expr: Option<&Expr>) -> VisitResult {
        let expr = match expr {
            Some(expr) => expr,
            None => return Ok((None, VisitStatus::Final)),
        };
        let predicate = PhysicalExpr::bind(expr, &self.layout)?;
        let task = self.ctx.planner().filter(&self.ctx, predicate)?;
        Ok((Some(task), VisitStatus::Final))
    }

    fn visit_having(&mut self, expr: Option<&Expr>) -> VisitResult {
        // Bound against the output of the grouping, if any.
        self.visit_where(expr)
    }

    fn visit_group_by(&mut self, select: &SelectNode) -> VisitResult {
        let exprs = select
            .projections
            .iter()
            .filter_map(|p| p.expr())
            .chain(select.having.iter());
        let aggregates = AggregateExpr::collect(exprs, &self.layout)?;
        if select.group_by.is_empty() && aggregates.is_empty() {
            return Ok((None, VisitStatus::Final));
        }

        let mut keys = Vec::with_capacity(select.group_by.len());
        let mut columns = Vec::with_capacity(select.group_by.len() + aggregates.len());
        for expr in &select.group_by {
            let key = PhysicalExpr::bind(expr, &self.layout)?;
            let column = match column_for(expr, &key, &self.layout)? {
                // Non-column keys are matched by their display later on.
                col if col.relation.is_none() => LayoutColumn::new(None, expr.to_string()),
                col => col,
            };
            columns.push(column);
            keys.push(key);
        }
        for agg in &aggregates {
            columns.push(LayoutColumn::new(None, agg.display.clone()));
        }

        trace!(keys = keys.len(), aggregates = aggregates.len(), "compiled grouping");
        let task = self.ctx.planner().group_by(&self.ctx, keys, aggregates)?;
        self.layout = ColumnLayout::new(columns);
        Ok((Some(task), VisitStatus::Final))
    }

    fn visit_projection(&mut self, projections: &[SelectExpr]) -> VisitResult {
        let mut exprs = Vec::new();
        let mut columns = Vec::new();
        for projection in projections {
            match projection {
                SelectExpr::Wildcard => {
                    for (idx, col) in self.layout.columns.iter().enumerate() {
                        exprs.push(PhysicalExpr::Column(idx));
                        columns.push(col.clone());
                    }
                }
                SelectExpr::QualifiedWildcard(reference) => {
                    let relation = reference
                        .base()
                        .map(|b| b.normalized())
                        .unwrap_or_default();
                    let positions = self.layout.relation_columns(&relation);
                    if positions.is_empty() {
                        return Err(ExecError::TableNotFound {
                            table: reference.to_string(),
                        });
                    }
                    for idx in positions {
                        exprs.push(PhysicalExpr::Column(idx));
                        columns.push(self.layout.columns[idx].clone());
                    }
                }
                SelectExpr::Expr(expr) => {
                    let bound = PhysicalExpr::bind(expr, &self.layout)?;
                    columns.push(column_for(expr, &bound, &self.layout)?);
                    exprs.push(bound);
                }
                SelectExpr::AliasedExpr(expr, alias) => {
                    exprs.push(PhysicalExpr::bind(expr, &self.layout)?);
                    columns.push(LayoutColumn::new(None, alias.normalized()));
                }
            }
        }

        let task = self.ctx.planner().projection(&self.ctx, exprs)?;
        self.layout = ColumnLayout::new(columns);
        Ok((Some(task), VisitStatus::Final))
    }
}

#[async_trait]
impl JobRunner for JobBuilder {
    fn setup(&mut self) -> Result<()> {
        JobBuilder::setup(self)
    }

    async fn run(&mut self) -> Result<()> {
        JobBuilder::run(self).await
    }

    fn close(&mut self) -> Result<()> {
        JobBuilder::close(self)
    }
}

/// Compile the SQL on the context into a job using the default visitor.
pub fn build_sql_job(ctx: Arc<Context>) -> Result<JobBuilder> {
    let mut job = JobBuilder::new(ctx, None);
    job.compile()?;
    Ok(job)
}

/// Compile the SQL on the context into a job, giving `visitor` the first
/// chance at every statement.
pub fn build_sql_job_with(ctx: Arc<Context>, visitor: Box<dyn Visitor>) -> Result<JobBuilder> {
    let mut job = JobBuilder::new(ctx, Some(visitor));
    job.compile()?;
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, DataType, MemTable, Schema, TableSchema};

    fn ctx(sql: &str) -> Arc<Context> {
        logutil::init_test();
        let users = MemTable::with_rows(
            TableSchema::new(
                "users",
                [
                    ColumnDef::new("id", DataType::Int64),
                    ColumnDef::new("name", DataType::Utf8),
                ],
            ),
            vec![
                Row::new(vec![1.into(), "ada".into()]),
                Row::new(vec![5.into(), "bob".into()]),
            ],
        )
        .unwrap();
        let schema = Schema::new("main").with_table(Arc::new(users));
        Arc::new(Context::new(sql).with_schema(Arc::new(schema)))
    }

    #[test]
    fn state_display() {
        assert_eq!("set up", JobState::SetUp.to_string());
        let err = ExecError::InvalidLifecycle {
            expected: JobState::SetUp,
            actual: JobState::Compiled,
        };
        assert_eq!(
            "Invalid job lifecycle, expected job to be set up, but it is compiled",
            err.to_string()
        );
    }

    #[test]
    fn compile_sets_statement() {
        let ctx = ctx("select id from users");
        let job = build_sql_job(ctx.clone()).unwrap();
        assert_eq!(JobState::Compiled, job.state());
        assert_eq!("SELECT", ctx.statement().unwrap().kind());
        assert_eq!("select", job.root().unwrap().name());
    }

    #[test]
    fn compile_twice() {
        let mut job = build_sql_job(ctx("select 1")).unwrap();
        let err = job.compile().unwrap_err();
        assert!(matches!(err, ExecError::InvalidLifecycle { .. }), "{err}");
    }

    #[test]
    fn multiple_statements() {
        let err = build_sql_job(ctx("select 1; select 2")).unwrap_err();
        assert!(matches!(err, ExecError::MultipleStatements(2)), "{err}");
    }

    #[test]
    fn output_layout_of_select() {
        let job = build_sql_job(ctx("select u.id, name as n, id + 1 from users u")).unwrap();
        let names: Vec<_> = job.output_layout().names().collect();
        assert_eq!(vec!["id", "n", "id + 1"], names);
    }

    #[test]
    fn insert_value_count_mismatch() {
        let err = build_sql_job(ctx("insert into users (id) values (1, 'x')")).unwrap_err();
        assert_eq!("INSERT has 2 values but 1 columns", err.to_string());
    }

    #[test]
    fn upsert_requires_key() {
        let err = build_sql_job(ctx("upsert into users (name) values ('x')")).unwrap_err();
        assert_eq!(
            "UPSERT requires a value for key column 'id'",
            err.to_string()
        );
    }

    #[tokio::test]
    async fn collect_select() {
        let mut job = build_sql_job(ctx("select name from users where id = 5")).unwrap();
        job.setup().unwrap();
        let rows = job.collect().await.unwrap();
        assert_eq!(vec![Row::new(vec!["bob".into()])], rows);
        assert_eq!(JobState::Finished, job.state());
        job.close().unwrap();
        assert_eq!(JobState::Closed, job.state());
    }

    #[tokio::test]
    async fn collect_requires_setup() {
        let mut job = build_sql_job(ctx("select 1")).unwrap();
        let err = job.collect().await.unwrap_err();
        assert!(matches!(
            err,
            ExecError::InvalidLifecycle {
                expected: JobState::SetUp,
                actual: JobState::Compiled
            }
        ));
    }
}
