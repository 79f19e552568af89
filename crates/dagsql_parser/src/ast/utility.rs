use std::fmt;

use super::{AstParseable, Expr, Ident, ObjectReference};
use crate::errors::{ParseError, Result};
use crate::keywords::Keyword;
use crate::parser::Parser;
use crate::statement::Statement;
use crate::tokens::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowNode {
    /// SHOW TABLES
    Tables,
    /// SHOW COLUMNS FROM <table>
    Columns(ObjectReference),
    /// SHOW <variable>
    Variable(Ident),
}

impl AstParseable for ShowNode {
    fn parse(parser: &mut Parser) -> Result<Self> {
        if parser.parse_keyword(Keyword::TABLES) {
            return Ok(ShowNode::Tables);
        }
        if parser.parse_keyword(Keyword::COLUMNS) {
            parser.expect_keyword(Keyword::FROM)?;
            return Ok(ShowNode::Columns(ObjectReference::parse(parser)?));
        }
        Ok(ShowNode::Variable(Ident::parse(parser)?))
    }
}

impl fmt::Display for ShowNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShowNode::Tables => write!(f, "SHOW TABLES"),
            ShowNode::Columns(table) => write!(f, "SHOW COLUMNS FROM {table}"),
            ShowNode::Variable(var) => write!(f, "SHOW {var}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeNode {
    pub table: ObjectReference,
}

impl AstParseable for DescribeNode {
    fn parse(parser: &mut Parser) -> Result<Self> {
        Ok(DescribeNode {
            table: ObjectReference::parse(parser)?,
        })
    }
}

impl fmt::Display for DescribeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DESCRIBE {}", self.table)
    }
}

/// SET <variable> = <value>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandNode {
    pub variable: ObjectReference,
    pub value: Expr,
}

impl AstParseable for CommandNode {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let variable = ObjectReference::parse(parser)?;
        parser.expect_token(&Token::Eq)?;
        let value = Expr::parse(parser)?;
        Ok(CommandNode { variable, value })
    }
}

impl fmt::Display for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SET {} = {}", self.variable, self.value)
    }
}

/// PREPARE <name> FROM '<sql>'
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareNode {
    pub name: Ident,
    /// The raw SQL being prepared.
    pub sql: String,
    pub statement: Box<Statement>,
}

impl AstParseable for PrepareNode {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let name = Ident::parse(parser)?;
        parser.expect_keyword(Keyword::FROM)?;
        let tok = parser.next_or_err("a quoted SQL string")?;
        let sql = match tok.token {
            Token::SingleQuotedString(s) => s,
            other => {
                return Err(ParseError::with_offset(
                    format!("Expected a quoted SQL string, got {other}"),
                    tok.offset,
                ))
            }
        };

        let mut stmts = crate::parse(&sql)?;
        if stmts.len() != 1 {
            return Err(ParseError::with_offset(
                format!(
                    "Expected exactly one statement to prepare, got {}",
                    stmts.len()
                ),
                tok.offset,
            ));
        }
        let statement = Box::new(stmts.remove(0));

        Ok(PrepareNode {
            name,
            sql,
            statement,
        })
    }
}

impl fmt::Display for PrepareNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PREPARE {} FROM '{}'", self.name, self.sql.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::testutil::parse_ast;

    #[test]
    fn show_variants() {
        assert_eq!(ShowNode::Tables, parse_ast::<ShowNode>("tables").unwrap());
        assert_eq!(
            ShowNode::Columns(ObjectReference::from_strs(&["users"])),
            parse_ast::<ShowNode>("columns from users").unwrap()
        );
        assert_eq!(
            ShowNode::Variable(Ident::new("channel_buffer")),
            parse_ast::<ShowNode>("channel_buffer").unwrap()
        );
    }

    #[test]
    fn prepare_inner_statement() {
        let node: PrepareNode = parse_ast("q1 from 'select a from t where b = ''x'''").unwrap();
        assert_eq!("select a from t where b = 'x'", node.sql);
        assert!(matches!(*node.statement, Statement::Select(_)));
    }

    #[test]
    fn prepare_requires_one_statement() {
        parse_ast::<PrepareNode>("q1 from 'show tables; show tables'").unwrap_err();
    }
}
