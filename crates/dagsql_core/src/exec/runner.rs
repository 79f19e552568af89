//! Pieces shared by every task implementation: the inbound and outbound
//! handoffs, shutdown aware send and receive, and running a task's work on
//! its own tokio task.
use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, trace};

use super::message::{message_channel, Message, MessageChan, MessageReceiver, MessageSender};
use crate::context::Context;
use crate::errors::{internal, ExecError, Result};
use crate::scalar::Row;

/// State common to every task.
#[derive(Debug)]
pub struct TaskBase {
    pub name: String,
    pub ctx: Arc<Context>,
    input: Option<MessageReceiver>,
    tx: Option<MessageSender>,
    chan: MessageChan,
    ran: bool,
    closed: bool,
}

impl TaskBase {
    pub fn new(name: impl Into<String>, ctx: &Arc<Context>) -> Self {
        let (tx, chan) = message_channel(ctx.config().channel_buffer);
        TaskBase {
            name: name.into(),
            ctx: ctx.clone(),
            input: None,
            tx: Some(tx),
            chan,
            ran: false,
            closed: false,
        }
    }

    pub fn message_out(&self) -> MessageChan {
        self.chan.clone()
    }

    pub fn set_input(&mut self, input: MessageReceiver) -> Result<()> {
        if self.input.is_some() {
            return Err(internal!("Task '{}' already has an input", self.name));
        }
        self.input = Some(input);
        Ok(())
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Setup for tasks that read from an inbound handoff.
    pub fn setup_with_input(&self, depth: usize) -> Result<()> {
        self.setup(depth);
        if !self.has_input() {
            return Err(ExecError::Runtime(format!(
                "Task '{}' has no input",
                self.name
            )));
        }
        Ok(())
    }

    pub fn setup(&self, depth: usize) {
        debug!(depth, task = %self.name, "setting up task");
    }

    pub fn take_input(&mut self) -> Result<MessageReceiver> {
        self.input.take().ok_or_else(|| {
            ExecError::Runtime(format!("Task '{}' has no input", self.name))
        })
    }

    /// Take the sending side of the outbound handoff. Can only be called
    /// once, dropping the emitter closes the handoff.
    pub fn emitter(&mut self) -> Result<Emitter> {
        if self.ran {
            return Err(internal!("Task '{}' already ran", self.name));
        }
        self.ran = true;
        let tx = self
            .tx
            .take()
            .ok_or_else(|| internal!("Task '{}' was closed before running", self.name))?;
        Ok(Emitter {
            ctx: self.ctx.clone(),
            tx,
            next_id: 0,
        })
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        trace!(task = %self.name, "closing task");
        self.closed = true;
        self.tx = None;
        self.input = None;
    }
}

/// Sending half of a task's outbound handoff. Assigns message ids in
/// emission order.
#[derive(Debug)]
pub struct Emitter {
    ctx: Arc<Context>,
    tx: MessageSender,
    next_id: u64,
}

impl Emitter {
    /// Send a row downstream, waiting for capacity.
    ///
    /// Returns false if the consumer went away, in which case the producer
    /// should stop.
    pub async fn emit(&mut self, row: Row) -> Result<bool> {
        let msg = Message {
            id: self.next_id,
            row,
        };
        self.next_id += 1;

        tokio::select! {
            biased;
            _ = self.ctx.shutdown_token().cancelled() => {
                debug!("shutdown observed on send");
                Err(ExecError::ShuttingDown)
            }
            res = self.tx.send(msg) => Ok(res.is_ok()),
        }
    }

    /// Number of messages sent so far.
    pub fn emitted(&self) -> u64 {
        self.next_id
    }
}

/// Receive the next message, returning `None` once the producer closed the
/// handoff.
pub async fn recv(ctx: &Context, rx: &mut MessageReceiver) -> Result<Option<Message>> {
    tokio::select! {
        biased;
        _ = ctx.shutdown_token().cancelled() => {
            debug!("shutdown observed on receive");
            Err(ExecError::ShuttingDown)
        }
        msg = rx.recv() => Ok(msg),
    }
}

/// Receive every remaining row.
pub async fn recv_all(ctx: &Context, rx: &mut MessageReceiver) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    while let Some(msg) = recv(ctx, rx).await? {
        rows.push(msg.row);
    }
    Ok(rows)
}

/// Run a task's work on its own tokio task so it can make progress
/// concurrently with the rest of the DAG.
///
/// A panic is converted into `TaskPanic`, unless recovery has been disabled
/// on the context in which case the panic is resumed on the caller.
pub async fn run_spawned<F>(ctx: &Arc<Context>, task: &str, fut: F) -> Result<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    trace!(%task, "spawning task");
    match tokio::spawn(fut).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            let panic = e.into_panic();
            if ctx.recovery_disabled() {
                std::panic::resume_unwind(panic);
            }
            let message = format_task_panic(panic);
            error!(%task, %message, "task panicked");
            Err(ExecError::TaskPanic {
                task: task.to_string(),
                message,
            })
        }
        Err(e) => Err(ExecError::Runtime(format!("Task '{task}' was cancelled: {e}"))),
    }
}

fn format_task_panic(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "UNKNOWN".to_string()
    }
}
