use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use super::impl_leaf_task;
use crate::context::Context;
use crate::errors::{internal, ExecError, Result};
use crate::exec::message::MessageReceiver;
use crate::exec::runner::{run_spawned, TaskBase};
use crate::rel::TaskRunner;
use crate::scalar::Row;
use crate::schema::Scanner;

/// Scans a single source.
///
/// The scan is taken during setup, rows are streamed out during run.
#[derive(Debug)]
pub struct Source {
    base: TaskBase,
    scanner: Arc<dyn Scanner>,
    rows: Option<Vec<Row>>,
}

impl Source {
    pub fn new(ctx: &Arc<Context>, binding: &str, scanner: Arc<dyn Scanner>) -> Self {
        Source {
            base: TaskBase::new(format!("source({binding})"), ctx),
            scanner,
            rows: None,
        }
    }
}

impl_leaf_task!(Source);

#[async_trait]
impl TaskRunner for Source {
    fn setup(&mut self, depth: usize) -> Result<()> {
        self.base.setup(depth);
        let rows = self.scanner.scan()?;
        trace!(task = %self.base.name, rows = rows.len(), "scanned source");
        self.rows = Some(rows);
        Ok(())
    }

    async fn run(&mut self) -> Result<()> {
        let rows = self
            .rows
            .take()
            .ok_or_else(|| internal!("Task '{}' was not set up", self.base.name))?;
        let mut emitter = self.base.emitter()?;

        run_spawned(&self.base.ctx, &self.base.name, async move {
            for row in rows {
                if !emitter.emit(row).await? {
                    break;
                }
            }
            Ok(())
        })
        .await
    }

    fn close(&mut self) -> Result<()> {
        self.rows = None;
        self.base.close();
        Ok(())
    }

    fn set_input(&mut self, _input: MessageReceiver) -> Result<()> {
        Err(ExecError::Plan(format!(
            "Task '{}' does not accept input",
            self.base.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::tasks::testutil::run_task;
    use crate::schema::{ColumnDef, DataType, MemTable, TableSchema};

    #[tokio::test]
    async fn scan_all_rows() {
        let ctx = Arc::new(Context::new("select * from t"));
        let rows = vec![Row::new(vec![1.into()]), Row::new(vec![2.into()])];
        let table = MemTable::with_rows(
            TableSchema::new("t", [ColumnDef::new("a", DataType::Int64)]),
            rows.clone(),
        )
        .unwrap();

        let mut task = Source::new(&ctx, "t", Arc::new(table));
        assert_eq!("source(t)", crate::rel::Task::name(&task));
        assert_eq!(rows, run_task(&ctx, &mut task).await.unwrap());
    }

    #[tokio::test]
    async fn run_without_setup() {
        let ctx = Arc::new(Context::new("select * from t"));
        let table = MemTable::new(TableSchema::new("t", []));
        let mut task = Source::new(&ctx, "t", Arc::new(table));
        task.run().await.unwrap_err();
    }
}
