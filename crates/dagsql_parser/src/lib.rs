//! SQL parser producing the statements compiled by `dagsql_core`.
//!
//! Hand written tokenizer and recursive descent parser. Only the subset of SQL
//! the job compiler knows how to turn into tasks is supported.
pub mod ast;
pub mod errors;
pub mod keywords;
pub mod parser;
pub mod statement;
pub mod tokens;

use errors::{ParseError, Result};
use parser::Parser;
use statement::Statement;

/// Parse a raw SQL string into zero or more statements.
///
/// Text made up only of whitespace and comments is an error. Text made up
/// only of statement separators returns an empty vec.
pub fn parse(sql: &str) -> Result<Vec<Statement>> {
    let toks = tokens::Tokenizer::new(sql).tokenize()?;
    if toks.is_empty() {
        return Err(ParseError::new("Empty SQL statement"));
    }
    let mut parser = Parser::with_tokens(toks);
    parser.parse_statements()
}

/// Parse a raw SQL string, pairing each statement with the text it was
/// parsed from, minus trailing whitespace.
pub fn parse_with_source(sql: &str) -> Result<Vec<(Statement, &str)>> {
    let toks = tokens::Tokenizer::new(sql).tokenize()?;
    if toks.is_empty() {
        return Err(ParseError::new("Empty SQL statement"));
    }
    let mut parser = Parser::with_tokens(toks);
    let stmts = parser.parse_statements_with_spans(sql.len())?;
    Ok(stmts
        .into_iter()
        .map(|(stmt, span)| (stmt, sql[span].trim_end()))
        .collect())
}
