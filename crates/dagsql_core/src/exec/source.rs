use std::sync::Arc;

use dagsql_parser::ast::Expr;
use tracing::trace;

use crate::context::Context;
use crate::errors::Result;
use crate::expr::PhysicalExpr;
use crate::plan::SourcePlan;
use crate::rel::{SourceVisitor, Task, VisitResult, VisitStatus};
use crate::schema::Scanner;

/// Compiles a single source of a statement into tasks.
///
/// Every method returns `Final` on success. Filters are bound against the
/// columns of this source only.
#[derive(Debug)]
pub struct SourceBuilder {
    ctx: Arc<Context>,
    plan: SourcePlan,
}

impl SourceBuilder {
    pub fn new(ctx: &Arc<Context>, plan: SourcePlan) -> Self {
        SourceBuilder {
            ctx: ctx.clone(),
            plan,
        }
    }

    pub fn plan(&self) -> &SourcePlan {
        &self.plan
    }

    /// Scan of the source followed by the source's filter, if any.
    fn scan_with_filter(&mut self, name: &str, scanner: Arc<dyn Scanner>) -> Result<Box<dyn Task>> {
        let mut children = Vec::with_capacity(2);
        if let (Some(scan), _) = self.visit_source(scanner)? {
            children.push(scan);
        }
        let filter = self.plan.filter.clone();
        if let (Some(filter), _) = self.visit_where(filter.as_ref())? {
            children.push(filter);
        }

        trace!(binding = %self.plan.binding, children = children.len(), "compiled source");
        let name = format!("{name}({})", self.plan.binding);
        self.ctx.planner().sequential(&self.ctx, &name, children)
    }
}

impl SourceVisitor for SourceBuilder {
    fn visit_source_select(&mut self) -> VisitResult {
        let scanner = self.plan.scanner.clone();
        let task = self.scan_with_filter("source_select", scanner)?;
        Ok((Some(task), VisitStatus::Final))
    }

    fn visit_source(&mut self, scanner: Arc<dyn Scanner>) -> VisitResult {
        let task = self
            .ctx
            .planner()
            .source(&self.ctx, &self.plan.binding, scanner)?;
        Ok((Some(task), VisitStatus::Final))
    }

    fn visit_source_join(&mut self, scanner: Arc<dyn Scanner>) -> VisitResult {
        let task = self.scan_with_filter("join_side", scanner)?;
        Ok((Some(task), VisitStatus::Final))
    }

    fn visit_where(&mut self, expr: Option<&Expr>) -> VisitResult {
        let expr = match expr {
            Some(expr) => expr,
            None => return Ok((None, VisitStatus::Final)),
        };
        let predicate = PhysicalExpr::bind(expr, &self.plan.layout)?;
        let task = self.ctx.planner().filter(&self.ctx, predicate)?;
        Ok((Some(task), VisitStatus::Final))
    }
}

#[cfg(test)]
mod tests {
    use dagsql_parser::ast::{ObjectReference, TableRef};
    use dagsql_parser::parse;
    use dagsql_parser::statement::Statement;

    use super::*;
    use crate::errors::ExecError;
    use crate::exec::tasks::testutil::run_task;
    use crate::plan::planner::into_runner;
    use crate::scalar::Row;
    use crate::schema::{ColumnDef, DataType, MemTable, Schema, TableSchema};

    fn ctx() -> Arc<Context> {
        let table = MemTable::with_rows(
            TableSchema::new(
                "users",
                [
                    ColumnDef::new("id", DataType::Int64),
                    ColumnDef::new("name", DataType::Utf8),
                ],
            ),
            vec![
                Row::new(vec![1.into(), "ada".into()]),
                Row::new(vec![2.into(), "bob".into()]),
            ],
        )
        .unwrap();
        let schema = Schema::new("main").with_table(Arc::new(table));
        Arc::new(Context::new("source").with_schema(Arc::new(schema)))
    }

    fn where_of(sql: &str) -> Option<Expr> {
        match parse(sql).unwrap().remove(0) {
            Statement::Select(select) => select.where_expr,
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    fn plan(ctx: &Context, filter: Option<Expr>) -> SourcePlan {
        let table = TableRef {
            reference: ObjectReference::from_strs(&["users"]),
            alias: Some(dagsql_parser::ast::Ident::new("u")),
        };
        let mut plan = SourcePlan::resolve(ctx, &table).unwrap();
        plan.filter = filter;
        plan
    }

    #[tokio::test]
    async fn select_with_filter() {
        let ctx = ctx();
        let filter = where_of("select * from users u where u.id = 2");
        let mut builder = SourceBuilder::new(&ctx, plan(&ctx, filter));

        let (task, status) = builder.visit_source_select().unwrap();
        assert_eq!(VisitStatus::Final, status);
        let mut task = into_runner(task.unwrap()).unwrap();
        assert_eq!("source_select(u)", task.name());
        assert_eq!(2, task.children().len());

        let rows = run_task(&ctx, task.as_mut()).await.unwrap();
        assert_eq!(vec![Row::new(vec![2.into(), "bob".into()])], rows);
    }

    #[test]
    fn no_filter_is_final() {
        let ctx = ctx();
        let mut builder = SourceBuilder::new(&ctx, plan(&ctx, None));
        let (task, status) = builder.visit_where(None).unwrap();
        assert!(task.is_none());
        assert_eq!(VisitStatus::Final, status);

        let (task, _) = builder.visit_source_select().unwrap();
        let task = into_runner(task.unwrap()).unwrap();
        assert_eq!(1, task.children().len());
    }

    #[test]
    fn filter_on_unknown_column() {
        let ctx = ctx();
        let mut builder = SourceBuilder::new(&ctx, plan(&ctx, None));
        let filter = where_of("select * from users where users.id = 1").unwrap();
        // Bound against the alias, so the table name doesn't resolve.
        let err = builder.visit_where(Some(&filter)).unwrap_err();
        assert!(matches!(err, ExecError::ColumnNotFound { .. }), "{err}");
    }
}
