use std::sync::Arc;

use dagsql_parser::ast::{CommandNode, DescribeNode, ObjectReference, ShowNode};
use tracing::debug;

use crate::context::Context;
use crate::errors::{plan_err, ExecError, Result};
use crate::expr::PhysicalExpr;
use crate::plan::resolve_table;
use crate::rel::{Task, VisitResult, VisitStatus, Visitor};
use crate::scalar::{Row, ScalarValue};

/// Override visitor answering metadata statements from the context.
///
/// Handles SHOW, DESCRIBE and SET. Everything else is left to the default
/// visitor.
#[derive(Debug)]
pub struct MetadataVisitor {
    ctx: Arc<Context>,
}

impl MetadataVisitor {
    pub fn new(ctx: &Arc<Context>) -> Self {
        MetadataVisitor { ctx: ctx.clone() }
    }

    fn rows_task(&self, name: &str, rows: Vec<Row>) -> Result<Box<dyn Task>> {
        let planner = self.ctx.planner();
        let values = planner.values(&self.ctx, rows)?;
        planner.sequential(&self.ctx, name, vec![values])
    }

    fn table_columns(&self, table: &ObjectReference) -> Result<Vec<Row>> {
        let scanner = resolve_table(&self.ctx, table)?;
        Ok(scanner
            .table_schema()
            .columns
            .iter()
            .map(|c| Row::new(vec![c.name.as_str().into(), c.datatype.to_string().into()]))
            .collect())
    }

    /// Current value of a setting. The recovery flag may have been changed
    /// after the context was created, so it's read from the context.
    fn setting(&self, name: &str) -> Result<String> {
        match name {
            "disable_recover" => Ok(self.ctx.recovery_disabled().to_string()),
            name => self.ctx.config().get_as_string(name),
        }
    }
}

impl Visitor for MetadataVisitor {
    fn visit_show(&mut self, show: &ShowNode) -> VisitResult {
        let (name, rows) = match show {
            ShowNode::Tables => {
                let schema = self.ctx.schema().ok_or(ExecError::NoSchemaSelected)?;
                let rows = schema
                    .tables()
                    .map(|t| Row::new(vec![t.table_schema().name.as_str().into()]))
                    .collect();
                ("show_tables", rows)
            }
            ShowNode::Columns(table) => ("show_columns", self.table_columns(table)?),
            ShowNode::Variable(var) => {
                let value = self.setting(&var.normalized())?;
                ("show_variable", vec![Row::new(vec![value.into()])])
            }
        };
        Ok((Some(self.rows_task(name, rows)?), VisitStatus::Final))
    }

    fn visit_describe(&mut self, describe: &DescribeNode) -> VisitResult {
        let rows = self.table_columns(&describe.table)?;
        Ok((Some(self.rows_task("describe", rows)?), VisitStatus::Final))
    }

    fn visit_command(&mut self, command: &CommandNode) -> VisitResult {
        let name = command
            .variable
            .0
            .iter()
            .map(|i| i.normalized())
            .collect::<Vec<_>>()
            .join(".");
        let value = match PhysicalExpr::bind_constant(&command.value)?.eval(&Row::empty())? {
            ScalarValue::Utf8(s) => s,
            other => other.to_string(),
        };

        // Validate against a scratch config so bad values error the same
        // way they would when configuring a context.
        let mut scratch = self.ctx.config().clone();
        scratch.set_from_str(&name, &value)?;
        match name.as_str() {
            "disable_recover" => {
                debug!(value = scratch.disable_recover, "setting recovery flag");
                self.ctx.set_disable_recover(scratch.disable_recover);
            }
            other => {
                return Err(plan_err!(
                    "Setting '{other}' can only be set before the job is created"
                ))
            }
        }

        Ok((Some(self.rows_task("set", Vec::new())?), VisitStatus::Final))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::job::build_sql_job_with;
    use crate::schema::{ColumnDef, DataType, MemTable, Schema, TableSchema};

    fn ctx(sql: &str) -> Arc<Context> {
        logutil::init_test();
        let table = MemTable::new(TableSchema::new(
            "users",
            [
                ColumnDef::new("id", DataType::Int64),
                ColumnDef::new("name", DataType::Utf8),
            ],
        ));
        let schema = Schema::new("main").with_table(Arc::new(table));
        Arc::new(Context::new(sql).with_schema(Arc::new(schema)))
    }

    async fn query(sql: &str) -> Result<Vec<Row>> {
        let ctx = ctx(sql);
        let mut job = build_sql_job_with(ctx.clone(), Box::new(MetadataVisitor::new(&ctx)))?;
        job.setup()?;
        let rows = job.collect().await?;
        job.close()?;
        Ok(rows)
    }

    #[tokio::test]
    async fn show_tables() {
        let rows = query("show tables").await.unwrap();
        assert_eq!(vec![Row::new(vec!["users".into()])], rows);
    }

    #[tokio::test]
    async fn describe_table() {
        let rows = query("describe users").await.unwrap();
        assert_eq!(
            vec![
                Row::new(vec!["id".into(), "Int64".into()]),
                Row::new(vec!["name".into(), "Utf8".into()]),
            ],
            rows
        );
    }

    #[tokio::test]
    async fn show_variable() {
        let rows = query("show channel_buffer").await.unwrap();
        assert_eq!(vec![Row::new(vec!["64".into()])], rows);
    }

    #[tokio::test]
    async fn set_recovery_flag() {
        let ctx = ctx("set disable_recover = true");
        let mut job =
            build_sql_job_with(ctx.clone(), Box::new(MetadataVisitor::new(&ctx))).unwrap();
        assert!(ctx.recovery_disabled());
        job.setup().unwrap();
        assert!(job.collect().await.unwrap().is_empty());
    }

    #[test]
    fn set_fixed_setting() {
        let ctx = ctx("set channel_buffer = 8");
        let err = build_sql_job_with(ctx.clone(), Box::new(MetadataVisitor::new(&ctx))).unwrap_err();
        assert_eq!(
            "Setting 'channel_buffer' can only be set before the job is created",
            err.to_string()
        );
    }

    #[test]
    fn select_falls_through() {
        let ctx = ctx("select id from users");
        let job = build_sql_job_with(ctx.clone(), Box::new(MetadataVisitor::new(&ctx))).unwrap();
        assert_eq!("select", job.root().unwrap().name());
    }
}
