use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::impl_leaf_task;
use crate::context::Context;
use crate::errors::{ExecError, Result};
use crate::exec::message::MessageReceiver;
use crate::exec::runner::{recv_all, run_spawned, TaskBase};
use crate::expr::PhysicalExpr;
use crate::rel::TaskRunner;
use crate::scalar::{Row, ScalarValue};
use crate::schema::{Mutator, Scanner};

#[derive(Debug, Clone)]
pub enum MutationOp {
    /// Insert rows read from the input. `columns` maps each input value to
    /// its position in the table, columns not listed are NULL.
    Insert { columns: Vec<usize> },
    /// Same as insert, replacing rows with a matching key.
    Upsert { columns: Vec<usize> },
    /// Set columns on rows matching the filter.
    Update {
        assignments: Vec<(usize, PhysicalExpr)>,
        filter: Option<PhysicalExpr>,
    },
    /// Remove rows matching the filter.
    Delete { filter: Option<PhysicalExpr> },
}

impl MutationOp {
    fn name(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Upsert { .. } => "upsert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }

    fn reads_input(&self) -> bool {
        matches!(self, Self::Insert { .. } | Self::Upsert { .. })
    }

    /// First column written by this op that doesn't exist in a table of the
    /// given width.
    fn column_out_of_range(&self, width: usize) -> Option<usize> {
        match self {
            Self::Insert { columns } | Self::Upsert { columns } => {
                columns.iter().copied().find(|&idx| idx >= width)
            }
            Self::Update { assignments, .. } => assignments
                .iter()
                .map(|(idx, _)| *idx)
                .find(|&idx| idx >= width),
            Self::Delete { .. } => None,
        }
    }
}

/// Modifies a source, emitting a single row with the number of affected rows.
#[derive(Debug)]
pub struct Mutation {
    base: TaskBase,
    scanner: Arc<dyn Scanner>,
    op: MutationOp,
}

impl Mutation {
    pub fn new(ctx: &Arc<Context>, scanner: Arc<dyn Scanner>, op: MutationOp) -> Self {
        let name = format!("{}({})", op.name(), scanner.table_schema().name);
        Mutation {
            base: TaskBase::new(name, ctx),
            scanner,
            op,
        }
    }
}

impl_leaf_task!(Mutation);

#[async_trait]
impl TaskRunner for Mutation {
    fn setup(&mut self, depth: usize) -> Result<()> {
        if self.op.reads_input() {
            self.base.setup_with_input(depth)?;
        } else {
            self.base.setup(depth);
        }
        if self.scanner.mutator().is_none() {
            return Err(ExecError::Runtime(format!(
                "Table '{}' is read only",
                self.scanner.table_schema().name
            )));
        }
        let width = self.scanner.table_schema().columns.len();
        if let Some(idx) = self.op.column_out_of_range(width) {
            return Err(ExecError::Runtime(format!(
                "Column {idx} out of range for table '{}'",
                self.scanner.table_schema().name
            )));
        }
        Ok(())
    }

    async fn run(&mut self) -> Result<()> {
        let mut input = if self.op.reads_input() {
            Some(self.base.take_input()?)
        } else {
            None
        };
        let mut emitter = self.base.emitter()?;
        let scanner = self.scanner.clone();
        let op = self.op.clone();
        let ctx = self.base.ctx.clone();
        let name = self.base.name.clone();

        run_spawned(&self.base.ctx, &self.base.name, async move {
            let rows = match input.as_mut() {
                Some(input) => recv_all(&ctx, input).await?,
                None => Vec::new(),
            };

            let mutator = scanner.mutator().ok_or_else(|| {
                ExecError::Runtime(format!(
                    "Table '{}' is read only",
                    scanner.table_schema().name
                ))
            })?;
            let width = scanner.table_schema().columns.len();
            let count = apply(mutator, &op, width, rows)?;
            debug!(task = %name, count, "mutation applied");

            emitter.emit(Row::new(vec![ScalarValue::Int64(count as i64)])).await?;
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

fn apply(mutator: &dyn Mutator, op: &MutationOp, width: usize, rows: Vec<Row>) -> Result<usize> {
    match op {
        MutationOp::Insert { columns } => mutator.insert(widen(rows, columns, width)?),
        MutationOp::Upsert { columns } => mutator.upsert(widen(rows, columns, width)?),
        MutationOp::Update {
            assignments,
            filter,
        } => mutator.update(&mut |row| {
            if !matches_filter(filter.as_ref(), row)? {
                return Ok(false);
            }
            // Assignments see the row as it was before the update.
            let orig = row.clone();
            for (idx, expr) in assignments {
                let value = expr.eval(&orig)?;
                match row.0.get_mut(*idx) {
                    Some(v) => *v = value,
                    None => return Err(ExecError::Runtime(format!("Column {idx} out of range"))),
                }
            }
            Ok(true)
        }),
        MutationOp::Delete { filter } => {
            mutator.delete(&mut |row| matches_filter(filter.as_ref(), row))
        }
    }
}

fn matches_filter(filter: Option<&PhysicalExpr>, row: &Row) -> Result<bool> {
    match filter {
        Some(filter) => filter.eval_predicate(row),
        None => Ok(true),
    }
}

/// Expand input rows to the full width of the table.
fn widen(rows: Vec<Row>, columns: &[usize], width: usize) -> Result<Vec<Row>> {
    rows.into_iter()
        .map(|row| {
            if row.len() != columns.len() {
                return Err(ExecError::Runtime(format!(
                    "Expected {} values, got {}",
                    columns.len(),
                    row.len()
                )));
            }
            let mut full = Row::nulls(width);
            for (value, &idx) in row.0.into_iter().zip(columns) {
                match full.0.get_mut(idx) {
                    Some(v) => *v = value,
                    None => return Err(ExecError::Runtime(format!("Column {idx} out of range"))),
                }
            }
            Ok(full)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use dagsql_parser::ast::BinaryOperator;

    use super::*;
    use crate::exec::tasks::testutil::{input_of, run_task};
    use crate::schema::{ColumnDef, DataType, MemTable, TableSchema};

    fn table() -> Arc<MemTable> {
        Arc::new(
            MemTable::with_rows(
                TableSchema::new(
                    "t",
                    [
                        ColumnDef::new("id", DataType::Int64),
                        ColumnDef::new("v", DataType::Utf8),
                    ],
                ),
                vec![
                    Row::new(vec![1.into(), "a".into()]),
                    Row::new(vec![2.into(), "b".into()]),
                ],
            )
            .unwrap(),
        )
    }

    fn id_eq(n: i64) -> PhysicalExpr {
        PhysicalExpr::Binary {
            left: Box::new(PhysicalExpr::Column(0)),
            op: BinaryOperator::Eq,
            right: Box::new(PhysicalExpr::Literal(n.into())),
        }
    }

    #[tokio::test]
    async fn insert_with_column_subset() {
        let ctx = Arc::new(Context::new("insert"));
        let t = table();
        let mut task = Mutation::new(&ctx, t.clone(), MutationOp::Insert { columns: vec![0] });
        task.set_input(input_of(vec![Row::new(vec![3.into()])]).await)
            .unwrap();

        let rows = run_task(&ctx, &mut task).await.unwrap();
        assert_eq!(vec![Row::new(vec![1.into()])], rows);
        assert_eq!(
            Row::new(vec![3.into(), ScalarValue::Null]),
            t.scan().unwrap()[2]
        );
    }

    #[tokio::test]
    async fn insert_column_out_of_range() {
        let ctx = Arc::new(Context::new("insert"));
        let mut task = Mutation::new(&ctx, table(), MutationOp::Insert { columns: vec![0, 2] });
        task.set_input(input_of(vec![Row::new(vec![3.into(), "c".into()])]).await)
            .unwrap();

        let err = task.setup(0).unwrap_err();
        assert_eq!("Column 2 out of range for table 't'", err.to_string());
    }

    #[test]
    fn widen_rejects_unknown_column() {
        let err = widen(vec![Row::new(vec![1.into()])], &[4], 2).unwrap_err();
        assert_eq!("Column 4 out of range", err.to_string());
    }

    #[tokio::test]
    async fn update_matching() {
        let ctx = Arc::new(Context::new("update"));
        let t = table();
        let op = MutationOp::Update {
            assignments: vec![(1, PhysicalExpr::Literal("z".into()))],
            filter: Some(id_eq(2)),
        };
        let mut task = Mutation::new(&ctx, t.clone(), op);

        let rows = run_task(&ctx, &mut task).await.unwrap();
        assert_eq!(vec![Row::new(vec![1.into()])], rows);
        assert_eq!(
            vec![
                Row::new(vec![1.into(), "a".into()]),
                Row::new(vec![2.into(), "z".into()]),
            ],
            t.scan().unwrap()
        );
    }

    #[tokio::test]
    async fn delete_all() {
        let ctx = Arc::new(Context::new("delete"));
        let t = table();
        let mut task = Mutation::new(&ctx, t.clone(), MutationOp::Delete { filter: None });

        let rows = run_task(&ctx, &mut task).await.unwrap();
        assert_eq!(vec![Row::new(vec![2.into()])], rows);
        assert_eq!(0, t.num_rows());
    }
}
