use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dagsql_parser::statement::Statement;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ExecConfig;
use crate::plan::planner::{DefaultTaskPlanner, TaskPlanner};
use crate::schema::Schema;

/// Per-query state shared by the compiler and every task in the job.
///
/// Everything except the statement, the recovery flag and the shutdown token
/// is fixed at construction.
#[derive(Debug)]
pub struct Context {
    raw: String,
    statement: RwLock<Option<Arc<Statement>>>,
    schema: Option<Arc<Schema>>,
    planner: Arc<dyn TaskPlanner>,
    config: ExecConfig,
    disable_recover: AtomicBool,
    shutdown: CancellationToken,
}

impl Context {
    pub fn new(raw: impl Into<String>) -> Self {
        let config = ExecConfig::default();
        Context {
            raw: raw.into(),
            statement: RwLock::new(None),
            schema: None,
            planner: Arc::new(DefaultTaskPlanner),
            disable_recover: AtomicBool::new(config.disable_recover),
            config,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_config(mut self, config: ExecConfig) -> Self {
        self.disable_recover = AtomicBool::new(config.disable_recover);
        self.config = config;
        self
    }

    pub fn with_planner(mut self, planner: Arc<dyn TaskPlanner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    pub fn planner(&self) -> &Arc<dyn TaskPlanner> {
        &self.planner
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Statement set by the compiler, if compilation got that far.
    pub fn statement(&self) -> Option<Arc<Statement>> {
        self.statement.read().clone()
    }

    pub(crate) fn set_statement(&self, statement: Arc<Statement>) {
        *self.statement.write() = Some(statement);
    }

    pub fn set_disable_recover(&self, disable: bool) {
        self.disable_recover.store(disable, Ordering::SeqCst);
    }

    /// If panics in tasks should be resumed rather than turned into errors.
    pub fn recovery_disabled(&self) -> bool {
        self.disable_recover.load(Ordering::SeqCst)
    }

    /// Signal every task in the job to stop.
    pub fn shutdown(&self) {
        debug!(raw = %self.raw, "shutting down job");
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}
