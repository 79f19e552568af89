use std::fmt;

use super::{AstParseable, Expr, Ident, ObjectReference};
use crate::errors::Result;
use crate::keywords::Keyword;
use crate::parser::Parser;

/// A reference to a table in a FROM clause.
///
/// `<reference> [AS <alias>]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub reference: ObjectReference,
    pub alias: Option<Ident>,
}

impl TableRef {
    /// Name other parts of the query use to refer to this table.
    pub fn binding_name(&self) -> String {
        match &self.alias {
            Some(alias) => alias.normalized(),
            None => self
                .reference
                .base()
                .map(|i| i.normalized())
                .unwrap_or_default(),
        }
    }
}

impl AstParseable for TableRef {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let reference = ObjectReference::parse(parser)?;
        let alias = parser.parse_alias()?;
        Ok(TableRef { reference, alias })
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} AS {}", self.reference, alias),
            None => write!(f, "{}", self.reference),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Join {
    pub join_type: JoinType,
    pub source: TableRef,
    /// ON <expr>
    pub on: Expr,
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kw = match self.join_type {
            JoinType::Inner => "JOIN",
            JoinType::Left => "LEFT JOIN",
        };
        write!(f, "{kw} {} ON {}", self.source, self.on)
    }
}

/// The FROM clause, a base table followed by zero or more joins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FromNode {
    pub source: TableRef,
    pub joins: Vec<Join>,
}

impl FromNode {
    /// All table references in the order they appear.
    pub fn sources(&self) -> impl Iterator<Item = &TableRef> {
        std::iter::once(&self.source).chain(self.joins.iter().map(|j| &j.source))
    }
}

impl AstParseable for FromNode {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let source = TableRef::parse(parser)?;

        let mut joins = Vec::new();
        loop {
            let join_type = if parser.parse_keyword(Keyword::JOIN)
                || parser.parse_keyword_sequence(&[Keyword::INNER, Keyword::JOIN])
            {
                JoinType::Inner
            } else if parser.parse_keyword_sequence(&[Keyword::LEFT, Keyword::JOIN])
                || parser.parse_keyword_sequence(&[Keyword::LEFT, Keyword::OUTER, Keyword::JOIN])
            {
                JoinType::Left
            } else {
                break;
            };

            let source = TableRef::parse(parser)?;
            parser.expect_keyword(Keyword::ON)?;
            let on = Expr::parse(parser)?;
            joins.push(Join {
                join_type,
                source,
                on,
            });
        }

        Ok(FromNode { source, joins })
    }
}

impl fmt::Display for FromNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)?;
        for join in &self.joins {
            write!(f, " {join}")?;
        }
        Ok(())
    }
}
