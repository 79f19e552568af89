use std::fmt;

use crate::ast::{
    CommandNode, DeleteNode, DescribeNode, InsertNode, ObjectReference, PrepareNode, SelectNode,
    ShowNode, UpdateNode,
};

/// A single parsed SQL statement.
///
/// Variants are mutually exclusive and immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SELECT ...
    Select(SelectNode),
    /// INSERT INTO <table> ...
    Insert(InsertNode),
    /// UPSERT INTO <table> ...
    Upsert(InsertNode),
    /// UPDATE <table> SET ...
    Update(UpdateNode),
    /// DELETE FROM <table> ...
    Delete(DeleteNode),
    /// SHOW ...
    Show(ShowNode),
    /// DESCRIBE <table>
    Describe(DescribeNode),
    /// SET <variable> = <value>
    Command(CommandNode),
    /// SELECT ... INTO <target> FROM ...
    Into {
        target: ObjectReference,
        select: SelectNode,
    },
    /// PREPARE <name> FROM '<sql>'
    Prepared(PrepareNode),
}

impl Statement {
    /// Short name of the statement kind, used in errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Select(_) => "SELECT",
            Statement::Insert(_) => "INSERT",
            Statement::Upsert(_) => "UPSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
            Statement::Show(_) => "SHOW",
            Statement::Describe(_) => "DESCRIBE",
            Statement::Command(_) => "COMMAND",
            Statement::Into { .. } => "INTO",
            Statement::Prepared(_) => "PREPARE",
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Select(select) => write!(f, "{select}"),
            Statement::Insert(insert) => write!(f, "INSERT INTO {insert}"),
            Statement::Upsert(insert) => write!(f, "UPSERT INTO {insert}"),
            Statement::Update(update) => write!(f, "{update}"),
            Statement::Delete(delete) => write!(f, "{delete}"),
            Statement::Show(show) => write!(f, "{show}"),
            Statement::Describe(describe) => write!(f, "{describe}"),
            Statement::Command(command) => write!(f, "{command}"),
            Statement::Into { target, select } => write!(f, "{select} INTO {target}"),
            Statement::Prepared(prepare) => write!(f, "{prepare}"),
        }
    }
}
