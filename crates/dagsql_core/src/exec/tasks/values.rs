use std::sync::Arc;

use async_trait::async_trait;

use super::impl_leaf_task;
use crate::context::Context;
use crate::errors::{ExecError, Result};
use crate::exec::message::MessageReceiver;
use crate::exec::runner::{run_spawned, TaskBase};
use crate::rel::TaskRunner;
use crate::scalar::Row;

/// Emits a fixed set of rows.
#[derive(Debug)]
pub struct Values {
    base: TaskBase,
    rows: Vec<Row>,
}

impl Values {
    pub fn new(ctx: &Arc<Context>, rows: Vec<Row>) -> Self {
        Values {
            base: TaskBase::new("values", ctx),
            rows,
        }
    }
}

impl_leaf_task!(Values);

#[async_trait]
impl TaskRunner for Values {
    fn setup(&mut self, depth: usize) -> Result<()> {
        self.base.setup(depth);
        Ok(())
    }

    async fn run(&mut self) -> Result<()> {
        let mut emitter = self.base.emitter()?;
        let rows = std::mem::take(&mut self.rows);
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
