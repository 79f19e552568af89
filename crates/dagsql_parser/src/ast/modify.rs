use std::fmt;

use super::{AstParseable, Expr, Ident, ObjectReference};
use crate::errors::Result;
use crate::keywords::Keyword;
use crate::parser::Parser;
use crate::tokens::Token;

/// Body of an INSERT or UPSERT, everything after `INTO`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertNode {
    pub table: ObjectReference,
    /// Explicit column list. Empty if columns weren't specified.
    pub columns: Vec<Ident>,
    pub values: Vec<Vec<Expr>>,
}

impl AstParseable for InsertNode {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let table = ObjectReference::parse(parser)?;

        let columns = if matches!(parser.peek().map(|t| &t.token), Some(Token::LeftParen)) {
            parser.parse_parenthesized(Ident::parse)?
        } else {
            Vec::new()
        };

        parser.expect_keyword(Keyword::VALUES)?;
        let values =
            parser.parse_comma_separated(|parser| parser.parse_parenthesized(Expr::parse))?;

        Ok(InsertNode {
            table,
            columns,
            values,
        })
    }
}

impl fmt::Display for InsertNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table)?;
        if !self.columns.is_empty() {
            let cols: Vec<_> = self.columns.iter().map(|c| c.to_string()).collect();
            write!(f, " ({})", cols.join(", "))?;
        }
        let rows: Vec<_> = self
            .values
            .iter()
            .map(|row| {
                let vals: Vec<_> = row.iter().map(|v| v.to_string()).collect();
                format!("({})", vals.join(", "))
            })
            .collect();
        write!(f, " VALUES {}", rows.join(", "))
    }
}

/// `<column> = <expr>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub column: Ident,
    pub value: Expr,
}

impl AstParseable for Assignment {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let column = Ident::parse(parser)?;
        parser.expect_token(&Token::Eq)?;
        let value = Expr::parse(parser)?;
        Ok(Assignment { column, value })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNode {
    pub table: ObjectReference,
    pub assignments: Vec<Assignment>,
    pub where_expr: Option<Expr>,
}

impl AstParseable for UpdateNode {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let table = ObjectReference::parse(parser)?;
        parser.expect_keyword(Keyword::SET)?;
        let assignments = parser.parse_comma_separated(Assignment::parse)?;
        let where_expr = if parser.parse_keyword(Keyword::WHERE) {
            Some(Expr::parse(parser)?)
        } else {
            None
        };

        Ok(UpdateNode {
            table,
            assignments,
            where_expr,
        })
    }
}

impl fmt::Display for UpdateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sets: Vec<_> = self
            .assignments
            .iter()
            .map(|a| format!("{} = {}", a.column, a.value))
            .collect();
        write!(f, "UPDATE {} SET {}", self.table, sets.join(", "))?;
        if let Some(expr) = &self.where_expr {
            write!(f, " WHERE {expr}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteNode {
    pub table: ObjectReference,
    pub where_expr: Option<Expr>,
}

impl AstParseable for DeleteNode {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let table = ObjectReference::parse(parser)?;
        let where_expr = if parser.parse_keyword(Keyword::WHERE) {
            Some(Expr::parse(parser)?)
        } else {
            None
        };
        Ok(DeleteNode { table, where_expr })
    }
}

impl fmt::Display for DeleteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE FROM {}", self.table)?;
        if let Some(expr) = &self.where_expr {
            write!(f, " WHERE {expr}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::testutil::parse_ast;

    #[test]
    fn insert_multiple_rows() {
        let node: InsertNode = parse_ast("t (a, b) values (1, 'x'), (2, 'y')").unwrap();
        assert_eq!(vec![Ident::new("a"), Ident::new("b")], node.columns);
        assert_eq!(2, node.values.len());
        assert_eq!("t (a, b) VALUES (1, 'x'), (2, 'y')", node.to_string());
    }

    #[test]
    fn insert_no_columns() {
        let node: InsertNode = parse_ast("t values (1)").unwrap();
        assert!(node.columns.is_empty());
    }

    #[test]
    fn update_with_where() {
        let node: UpdateNode = parse_ast("t set a = a + 1, b = 'z' where c = 3").unwrap();
        assert_eq!(2, node.assignments.len());
        assert!(node.where_expr.is_some());
    }
}
