use dagsql_parser::errors::ParseError;

use crate::exec::job::JobState;
use crate::rel::VisitStatus;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Expected exactly one statement, got {0}")]
    MultipleStatements(usize),

    #[error("No statement for parse: {raw}")]
    NoStatement { raw: String },

    #[error("No task found: {raw}")]
    NoTaskFound { raw: String },

    #[error("Expected TaskRunner but was {task}")]
    NotTaskRunner { task: String },

    #[error("Not implemented: {statement}")]
    NotImplemented { statement: &'static str },

    #[error("No schema selected")]
    NoSchemaSelected,

    #[error("Missing table: {table}")]
    TableNotFound { table: String },

    #[error("Missing column: {column}")]
    ColumnNotFound { column: String },

    #[error("Ambiguous column reference: {column}")]
    AmbiguousColumn { column: String },

    #[error("{0}")]
    Plan(String),

    #[error("No task exists for this job")]
    NoRootTask,

    #[error("Root task has no children to drain")]
    EmptyRoot,

    #[error("Invalid job lifecycle, expected job to be {expected}, but it is {actual}")]
    InvalidLifecycle { expected: JobState, actual: JobState },

    #[error("Received shutdown signal")]
    ShuttingDown,

    #[error("Task '{task}' panicked: {message}")]
    TaskPanic { task: String, message: String },

    #[error("{0}")]
    Runtime(String),

    /// Multiple errors reduced to a single newline delimited message.
    #[error("{0}")]
    Aggregate(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed query text.
    Parse,
    /// Statement couldn't be compiled into a task DAG.
    Compile,
    /// The active visitor doesn't support the statement.
    UnsupportedStatement,
    /// A task failed during setup, run or close.
    Runtime,
    /// Execution stopped due to a shutdown request.
    Shutdown,
    /// Multiple independent failures.
    Aggregate,
    /// Programming error.
    Internal,
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::Parse(_) | ExecError::MultipleStatements(_) => ErrorKind::Parse,
            ExecError::NoTaskFound { .. }
            | ExecError::NotTaskRunner { .. }
            | ExecError::NoSchemaSelected
            | ExecError::TableNotFound { .. }
            | ExecError::ColumnNotFound { .. }
            | ExecError::AmbiguousColumn { .. }
            | ExecError::Plan(_) => ErrorKind::Compile,
            ExecError::NotImplemented { .. } => ErrorKind::UnsupportedStatement,
            ExecError::NoRootTask
            | ExecError::EmptyRoot
            | ExecError::InvalidLifecycle { .. }
            | ExecError::TaskPanic { .. }
            | ExecError::Runtime(_) => ErrorKind::Runtime,
            ExecError::ShuttingDown => ErrorKind::Shutdown,
            ExecError::Aggregate(_) => ErrorKind::Aggregate,
            ExecError::NoStatement { .. } | ExecError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Visit status that accompanies this error when returned from a visitor.
    pub const fn visit_status(&self) -> VisitStatus {
        VisitStatus::Error
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, ExecError::ShuttingDown)
    }
}

pub type Result<T, E = ExecError> = std::result::Result<T, E>;

#[allow(unused_macros)]
macro_rules! internal {
    ($($arg:tt)*) => {
        crate::errors::ExecError::Internal(std::format!($($arg)*))
    };
}
pub(crate) use internal;

#[allow(unused_macros)]
macro_rules! plan_err {
    ($($arg:tt)*) => {
        crate::errors::ExecError::Plan(std::format!($($arg)*))
    };
}
pub(crate) use plan_err;
