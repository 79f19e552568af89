use std::sync::Arc;

use async_trait::async_trait;
use dagsql_parser::ast::JoinType;
use futures::future::try_join_all;
use tracing::trace;

use crate::context::Context;
use crate::errors::{internal, ExecError, Result};
use crate::exec::message::{MessageChan, MessageReceiver};
use crate::exec::runner::{recv, recv_all, run_spawned, TaskBase};
use crate::expr::PhysicalExpr;
use crate::rel::{Task, TaskRunner};
use crate::scalar::Row;

/// Nested loop join of exactly two children.
///
/// The right side is buffered in full, the left side is streamed. Output
/// rows are the left row followed by the right row. For LEFT joins, left
/// rows without a match are padded with NULLs.
#[derive(Debug)]
pub struct JoinMerge {
    base: TaskBase,
    join_type: JoinType,
    children: Vec<Box<dyn TaskRunner>>,
    on: PhysicalExpr,
    right_width: usize,
    left_rx: Option<MessageReceiver>,
    right_rx: Option<MessageReceiver>,
}

impl JoinMerge {
    pub fn new(
        ctx: &Arc<Context>,
        join_type: JoinType,
        left: Box<dyn TaskRunner>,
        right: Box<dyn TaskRunner>,
        on: PhysicalExpr,
        right_width: usize,
    ) -> Self {
        let name = match join_type {
            JoinType::Inner => "join(inner)",
            JoinType::Left => "join(left)",
        };
        JoinMerge {
            base: TaskBase::new(name, ctx),
            join_type,
            children: vec![left, right],
            on,
            right_width,
            left_rx: None,
            right_rx: None,
        }
    }
}

impl Task for JoinMerge {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn children(&self) -> &[Box<dyn TaskRunner>] {
        &self.children
    }

    fn message_out(&self) -> MessageChan {
        self.base.message_out()
    }

    fn into_runner(self: Box<Self>) -> Result<Box<dyn TaskRunner>, Box<dyn Task>> {
        Ok(self)
    }
}

#[async_trait]
impl TaskRunner for JoinMerge {
    fn setup(&mut self, depth: usize) -> Result<()> {
        self.base.setup(depth);
        if self.children.len() != 2 {
            return Err(internal!(
                "Join expects exactly two children, got {}",
                self.children.len()
            ));
        }

        let take = |idx: usize| -> Result<MessageReceiver> {
            let child = &self.children[idx];
            child
                .message_out()
                .take()
                .ok_or_else(|| internal!("Output of '{}' already taken", child.name()))
        };
        let left = take(0)?;
        let right = take(1)?;
        self.left_rx = Some(left);
        self.right_rx = Some(right);

        for child in &mut self.children {
            child.setup(depth + 1)?;
        }
        Ok(())
    }

    async fn run(&mut self) -> Result<()> {
        let mut left = self
            .left_rx
            .take()
            .ok_or_else(|| internal!("Task '{}' was not set up", self.base.name))?;
        let mut right = self
            .right_rx
            .take()
            .ok_or_else(|| internal!("Task '{}' was not set up", self.base.name))?;
        let mut emitter = self.base.emitter()?;
        let on = self.on.clone();
        let join_type = self.join_type;
        let right_width = self.right_width;
        let ctx = self.base.ctx.clone();
        let name = self.base.name.clone();

        let merge = run_spawned(&self.base.ctx, &self.base.name, async move {
            let rights = recv_all(&ctx, &mut right).await?;
            trace!(task = %name, rows = rights.len(), "buffered right side of join");

            while let Some(msg) = recv(&ctx, &mut left).await? {
                let mut matched = false;
                for r in &rights {
                    let joined = msg.row.concat(r);
                    if on.eval_predicate(&joined)? {
                        matched = true;
                        if !emitter.emit(joined).await? {
                            return Ok(());
                        }
                    }
                }
                if !matched && join_type == JoinType::Left {
                    let joined = msg.row.concat(&Row::nulls(right_width));
                    if !emitter.emit(joined).await? {
                        return Ok(());
                    }
                }
            }
            Ok(())
        });

        let children = try_join_all(self.children.iter_mut().map(|c| c.run()));
        futures::try_join!(children, merge)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.left_rx = None;
        self.right_rx = None;
        self.base.close();

        let mut errs = crate::errlist::ErrorList::new();
        for child in &mut self.children {
            errs.append(child.close().err());
        }
        errs.into_result()
    }

    fn set_input(&mut self, _input: MessageReceiver) -> Result<()> {
        Err(ExecError::Plan(format!(
            "Task '{}' does not accept input",
            self.base.name
        )))
    }
}
