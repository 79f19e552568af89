//! Protocols for compiling statements into tasks.
//!
//! A statement is dispatched to the matching `Visitor` method through
//! `Accept`. Every visit returns an optional task along with a `VisitStatus`
//! telling the caller what to do with it. Compilation of a single source
//! within a statement goes through the narrower `SourceVisitor`.
pub mod task;

use std::fmt;
use std::sync::Arc;

use dagsql_parser::ast::{
    CommandNode, DeleteNode, DescribeNode, Expr, InsertNode, ObjectReference, PrepareNode,
    SelectExpr, SelectNode, ShowNode, UpdateNode,
};
use dagsql_parser::statement::Statement;

pub use task::{Task, TaskRunner};

use crate::errors::Result;
use crate::schema::Scanner;

/// Signal returned alongside every compile step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitStatus {
    /// Status before anything was visited. Never returned from a visit.
    Unknown,
    /// Compilation failed. Always carried by an `Err` result.
    Error,
    /// The returned task is complete and should be used as is.
    Final,
    /// The caller may extend the returned task, or supply its own if no task
    /// was returned.
    Continue,
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Error => write!(f, "error"),
            Self::Final => write!(f, "final"),
            Self::Continue => write!(f, "continue"),
        }
    }
}

pub type VisitResult = Result<(Option<Box<dyn Task>>, VisitStatus)>;

/// Status of a visit result, mapping errors to `VisitStatus::Error`.
pub fn status_of(result: &VisitResult) -> VisitStatus {
    match result {
        Ok((_, status)) => *status,
        Err(e) => e.visit_status(),
    }
}

/// Compiles statements into tasks.
///
/// Default implementations return `(None, Continue)`, deferring to whichever
/// visitor wraps this one. Implementations override only the statements
/// they know how to compile.
pub trait Visitor: Send {
    fn visit_prepared_stmt(&mut self, _stmt: &PrepareNode) -> VisitResult {
        Ok((None, VisitStatus::Continue))
    }

    fn visit_select(&mut self, _select: &SelectNode) -> VisitResult {
        Ok((None, VisitStatus::Continue))
    }

    fn visit_insert(&mut self, _insert: &InsertNode) -> VisitResult {
        Ok((None, VisitStatus::Continue))
    }

    fn visit_upsert(&mut self, _upsert: &InsertNode) -> VisitResult {
        Ok((None, VisitStatus::Continue))
    }

    fn visit_update(&mut self, _update: &UpdateNode) -> VisitResult {
        Ok((None, VisitStatus::Continue))
    }

    fn visit_delete(&mut self, _delete: &DeleteNode) -> VisitResult {
        Ok((None, VisitStatus::Continue))
    }

    fn visit_show(&mut self, _show: &ShowNode) -> VisitResult {
        Ok((None, VisitStatus::Continue))
    }

    fn visit_describe(&mut self, _describe: &DescribeNode) -> VisitResult {
        Ok((None, VisitStatus::Continue))
    }

    fn visit_command(&mut self, _command: &CommandNode) -> VisitResult {
        Ok((None, VisitStatus::Continue))
    }

    fn visit_into(&mut self, _target: &ObjectReference, _select: &SelectNode) -> VisitResult {
        Ok((None, VisitStatus::Continue))
    }

    /// WHERE of a select. Called with `None` if there's no WHERE clause.
    fn visit_where(&mut self, _expr: Option<&Expr>) -> VisitResult {
        Ok((None, VisitStatus::Continue))
    }

    /// HAVING of a select. Called with `None` if there's no HAVING clause.
    fn visit_having(&mut self, _expr: Option<&Expr>) -> VisitResult {
        Ok((None, VisitStatus::Continue))
    }

    /// GROUP BY of a select. Takes the whole select since aggregates are
    /// collected from the select list and HAVING.
    fn visit_group_by(&mut self, _select: &SelectNode) -> VisitResult {
        Ok((None, VisitStatus::Continue))
    }

    fn visit_projection(&mut self, _projections: &[SelectExpr]) -> VisitResult {
        Ok((None, VisitStatus::Continue))
    }
}

/// Compiles a single source of a statement.
pub trait SourceVisitor {
    /// Compile the whole source, the scan along with any source-local filter.
    fn visit_source_select(&mut self) -> VisitResult;

    /// Compile a scan over the given source.
    fn visit_source(&mut self, scanner: Arc<dyn Scanner>) -> VisitResult;

    /// Compile one side of a join over the given source.
    fn visit_source_join(&mut self, scanner: Arc<dyn Scanner>) -> VisitResult;

    /// Compile a filter local to this source.
    fn visit_where(&mut self, expr: Option<&Expr>) -> VisitResult;
}

/// Double dispatch from a statement to the matching visitor method.
pub trait Accept {
    fn accept(&self, visitor: &mut dyn Visitor) -> VisitResult;
}

impl Accept for Statement {
    fn accept(&self, visitor: &mut dyn Visitor) -> VisitResult {
        match self {
            Statement::Select(select) => visitor.visit_select(select),
            Statement::Insert(insert) => visitor.visit_insert(insert),
            Statement::Upsert(upsert) => visitor.visit_upsert(upsert),
            Statement::Update(update) => visitor.visit_update(update),
            Statement::Delete(delete) => visitor.visit_delete(delete),
            Statement::Show(show) => visitor.visit_show(show),
            Statement::Describe(describe) => visitor.visit_describe(describe),
            Statement::Command(command) => visitor.visit_command(command),
            Statement::Into { target, select } => visitor.visit_into(target, select),
            Statement::Prepared(prepared) => visitor.visit_prepared_stmt(prepared),
        }
    }
}
