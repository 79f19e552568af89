use std::fmt;

use super::{AstParseable, Expr, FromNode, Ident, ObjectReference};
use crate::errors::Result;
use crate::keywords::Keyword;
use crate::parser::Parser;
use crate::tokens::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectNode {
    /// DISTINCT
    pub distinct: bool,
    /// Projection list. May included wildcards.
    pub projections: Vec<SelectExpr>,
    /// INTO
    pub into: Option<ObjectReference>,
    /// FROM
    pub from: Option<FromNode>,
    /// WHERE
    pub where_expr: Option<Expr>,
    /// GROUP BY
    pub group_by: Vec<Expr>,
    /// HAVING
    pub having: Option<Expr>,
}

impl AstParseable for SelectNode {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let distinct = parser.parse_keyword(Keyword::DISTINCT);

        // Select list
        let projections = parser.parse_comma_separated(SelectExpr::parse)?;

        // INTO
        let into = if parser.parse_keyword(Keyword::INTO) {
            Some(ObjectReference::parse(parser)?)
        } else {
            None
        };

        // FROM
        let from = if parser.parse_keyword(Keyword::FROM) {
            Some(FromNode::parse(parser)?)
        } else {
            None
        };

        // WHERE
        let where_expr = if parser.parse_keyword(Keyword::WHERE) {
            Some(Expr::parse(parser)?)
        } else {
            None
        };

        // GROUP BY
        let group_by = if parser.parse_keyword_sequence(&[Keyword::GROUP, Keyword::BY]) {
            parser.parse_comma_separated(Expr::parse)?
        } else {
            Vec::new()
        };

        // HAVING
        let having = if parser.parse_keyword(Keyword::HAVING) {
            Some(Expr::parse(parser)?)
        } else {
            None
        };

        Ok(SelectNode {
            distinct,
            projections,
            into,
            from,
            where_expr,
            group_by,
            having,
        })
    }
}

impl fmt::Display for SelectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        let projs: Vec<_> = self.projections.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", projs.join(", "))?;
        if let Some(into) = &self.into {
            write!(f, " INTO {into}")?;
        }
        if let Some(from) = &self.from {
            write!(f, " FROM {from}")?;
        }
        if let Some(expr) = &self.where_expr {
            write!(f, " WHERE {expr}")?;
        }
        if !self.group_by.is_empty() {
            let groups: Vec<_> = self.group_by.iter().map(|g| g.to_string()).collect();
            write!(f, " GROUP BY {}", groups.join(", "))?;
        }
        if let Some(expr) = &self.having {
            write!(f, " HAVING {expr}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectExpr {
    /// An unaliases expression.
    Expr(Expr),
    /// An aliased expression.
    ///
    /// `<expr> AS <ident>`
    AliasedExpr(Expr, Ident),
    /// A qualified wild card.
    ///
    /// `<reference>.*`
    QualifiedWildcard(ObjectReference),
    /// An unqualifed wild card.
    Wildcard,
}

impl SelectExpr {
    pub fn expr(&self) -> Option<&Expr> {
        match self {
            SelectExpr::Expr(expr) | SelectExpr::AliasedExpr(expr, _) => Some(expr),
            _ => None,
        }
    }
}

impl AstParseable for SelectExpr {
    fn parse(parser: &mut Parser) -> Result<Self> {
        if parser.consume_token(&Token::Mul) {
            return Ok(SelectExpr::Wildcard);
        }

        // Check for `<ident>[.<ident>]*.*`, resetting if it's just an
        // expression.
        let idx = parser.idx;
        let mut idents = Vec::new();
        while let Some(Token::Word(_)) = parser.peek().map(|t| &t.token) {
            match Ident::parse(parser) {
                Ok(ident) => idents.push(ident),
                Err(_) => break,
            }
            if !parser.consume_token(&Token::Period) {
                break;
            }
            if parser.consume_token(&Token::Mul) {
                return Ok(SelectExpr::QualifiedWildcard(ObjectReference(idents)));
            }
        }
        parser.idx = idx;

        let expr = Expr::parse(parser)?;
        match parser.parse_alias()? {
            Some(alias) => Ok(SelectExpr::AliasedExpr(expr, alias)),
            None => Ok(SelectExpr::Expr(expr)),
        }
    }
}

impl fmt::Display for SelectExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectExpr::Expr(expr) => write!(f, "{expr}"),
            SelectExpr::AliasedExpr(expr, alias) => write!(f, "{expr} AS {alias}"),
            SelectExpr::QualifiedWildcard(reference) => write!(f, "{reference}.*"),
            SelectExpr::Wildcard => write!(f, "*"),
        }
    }
}
