use std::fmt;

use super::{AstParseable, Ident};
use crate::errors::{ParseError, Result};
use crate::keywords::Keyword;
use crate::parser::Parser;
use crate::tokens::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// Plus, e.g. `+9`
    Plus,
    /// Minus, e.g. `-9`
    Minus,
    /// Not, e.g. `NOT(true)`
    Not,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Plus => write!(f, "+"),
            UnaryOperator::Minus => write!(f, "-"),
            UnaryOperator::Not => write!(f, "NOT "),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// Plus, e.g. `a + b`
    Plus,
    /// Minus, e.g. `a - b`
    Minus,
    /// Multiply, e.g. `a * b`
    Multiply,
    /// Divide, e.g. `a / b`
    Divide,
    /// Modulo, e.g. `a % b`
    Modulo,
    /// Greater than, e.g. `a > b`
    Gt,
    /// Less than, e.g. `a < b`
    Lt,
    /// Greater equal, e.g. `a >= b`
    GtEq,
    /// Less equal, e.g. `a <= b`
    LtEq,
    /// Equal, e.g. `a = b`
    Eq,
    /// Not equal, e.g. `a <> b`
    NotEq,
    /// And, e.g. `a AND b`
    And,
    /// Or, e.g. `a OR b`
    Or,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Gt => ">",
            BinaryOperator::Lt => "<",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    /// Unparsed number literal.
    Number(String),
    /// String literal.
    SingleQuotedString(String),
    /// Boolean literal.
    Boolean(bool),
    /// Null literal
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{n}"),
            Literal::SingleQuotedString(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Boolean(true) => write!(f, "TRUE"),
            Literal::Boolean(false) => write!(f, "FALSE"),
            Literal::Null => write!(f, "NULL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionArg {
    /// `COUNT(*)`
    Wildcard,
    Expr(Expr),
}

impl fmt::Display for FunctionArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionArg::Wildcard => write!(f, "*"),
            FunctionArg::Expr(expr) => write!(f, "{expr}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Column or table identifier.
    Ident(Ident),
    /// Compound identifier.
    ///
    /// `table.col`
    CompoundIdent(Vec<Ident>),
    /// An expression literal,
    Literal(Literal),
    /// A unary expression.
    UnaryExpr {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    /// A binary expression.
    BinaryExpr {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// `<expr> IS [NOT] NULL`
    IsNull { expr: Box<Expr>, negated: bool },
    /// A function call.
    Function { name: Ident, args: Vec<FunctionArg> },
    /// A parenthesized expression.
    Nested(Box<Expr>),
}

impl AstParseable for Expr {
    fn parse(parser: &mut Parser) -> Result<Self> {
        Self::parse_subexpr(parser, 0)
    }
}

impl Expr {
    // Precedences, ordered low to high.
    const OR_PREC: u8 = 5;
    const AND_PREC: u8 = 10;
    const NOT_PREC: u8 = 15;
    const IS_PREC: u8 = 17;
    const CMP_PREC: u8 = 20;
    const PLUS_MINUS_PREC: u8 = 30;
    const MUL_DIV_MOD_PREC: u8 = 40;
    const UNARY_PREC: u8 = 50;

    fn parse_subexpr(parser: &mut Parser, precedence: u8) -> Result<Self> {
        let mut expr = Expr::parse_prefix(parser)?;

        loop {
            let next_precedence = Self::get_infix_precedence(parser);
            if precedence >= next_precedence {
                break;
            }

            expr = Self::parse_infix(parser, expr, next_precedence)?;
        }

        Ok(expr)
    }

    fn parse_prefix(parser: &mut Parser) -> Result<Self> {
        let tok = parser.next_or_err("an expression")?;

        let expr = match tok.token {
            Token::Word(w) => match w.keyword {
                Some(Keyword::NOT) => Expr::UnaryExpr {
                    op: UnaryOperator::Not,
                    expr: Box::new(Expr::parse_subexpr(parser, Self::NOT_PREC)?),
                },
                Some(Keyword::TRUE) => Expr::Literal(Literal::Boolean(true)),
                Some(Keyword::FALSE) => Expr::Literal(Literal::Boolean(false)),
                Some(Keyword::NULL) => Expr::Literal(Literal::Null),
                Some(kw) if kw.is_reserved() => {
                    return Err(ParseError::with_offset(
                        format!("Unexpected keyword {kw:?} in expression"),
                        tok.offset,
                    ))
                }
                _ => {
                    let ident = Ident {
                        value: w.value,
                        quoted: w.quote.is_some(),
                    };
                    Self::parse_ident_expr(parser, ident)?
                }
            },
            Token::Number(n) => Expr::Literal(Literal::Number(n)),
            Token::SingleQuotedString(s) => Expr::Literal(Literal::SingleQuotedString(s)),
            Token::Minus => Expr::UnaryExpr {
                op: UnaryOperator::Minus,
                expr: Box::new(Expr::parse_subexpr(parser, Self::UNARY_PREC)?),
            },
            Token::Plus => Expr::UnaryExpr {
                op: UnaryOperator::Plus,
                expr: Box::new(Expr::parse_subexpr(parser, Self::UNARY_PREC)?),
            },
            Token::LeftParen => {
                let expr = Expr::parse(parser)?;
                parser.expect_token(&Token::RightParen)?;
                Expr::Nested(Box::new(expr))
            }
            other => {
                return Err(ParseError::with_offset(
                    format!("Unexpected token '{other}' in expression"),
                    tok.offset,
                ))
            }
        };

        Ok(expr)
    }

    /// Continue parsing an expression that started with an identifier. Could
    /// be a plain ident, a compound ident, or a function call.
    fn parse_ident_expr(parser: &mut Parser, ident: Ident) -> Result<Self> {
        if parser.consume_token(&Token::LeftParen) {
            let args = if parser.consume_token(&Token::RightParen) {
                Vec::new()
            } else {
                let args = parser.parse_comma_separated(|parser| {
                    if parser.consume_token(&Token::Mul) {
                        Ok(FunctionArg::Wildcard)
                    } else {
                        Ok(FunctionArg::Expr(Expr::parse(parser)?))
                    }
                })?;
                parser.expect_token(&Token::RightParen)?;
                args
            };
            return Ok(Expr::Function { name: ident, args });
        }

        let mut idents = vec![ident];
        while parser.consume_token(&Token::Period) {
            idents.push(Ident::parse(parser)?);
        }

        if idents.len() == 1 {
            Ok(Expr::Ident(idents.remove(0)))
        } else {
            Ok(Expr::CompoundIdent(idents))
        }
    }

    fn parse_infix(parser: &mut Parser, prefix: Expr, precedence: u8) -> Result<Self> {
        let tok = parser.next_or_err("an operator")?;

        if tok.is_keyword(Keyword::IS) {
            let negated = parser.parse_keyword(Keyword::NOT);
            parser.expect_keyword(Keyword::NULL)?;
            return Ok(Expr::IsNull {
                expr: Box::new(prefix),
                negated,
            });
        }

        let op = match &tok.token {
            Token::Word(w) => match w.keyword {
                Some(Keyword::AND) => BinaryOperator::And,
                Some(Keyword::OR) => BinaryOperator::Or,
                _ => {
                    return Err(ParseError::with_offset(
                        format!("Unexpected word '{}' in expression", w.value),
                        tok.offset,
                    ))
                }
            },
            Token::Eq => BinaryOperator::Eq,
            Token::Neq => BinaryOperator::NotEq,
            Token::Lt => BinaryOperator::Lt,
            Token::LtEq => BinaryOperator::LtEq,
            Token::Gt => BinaryOperator::Gt,
            Token::GtEq => BinaryOperator::GtEq,
            Token::Plus => BinaryOperator::Plus,
            Token::Minus => BinaryOperator::Minus,
            Token::Mul => BinaryOperator::Multiply,
            Token::Div => BinaryOperator::Divide,
            Token::Mod => BinaryOperator::Modulo,
            other => {
                return Err(ParseError::with_offset(
                    format!("Unexpected token '{other}', expected an operator"),
                    tok.offset,
                ))
            }
        };

        let right = Expr::parse_subexpr(parser, precedence)?;

        Ok(Expr::BinaryExpr {
            left: Box::new(prefix),
            op,
            right: Box::new(right),
        })
    }

    /// Get the precedence of the next infix operator, 0 if the next token
    /// doesn't continue the expression.
    fn get_infix_precedence(parser: &Parser) -> u8 {
        let tok = match parser.peek() {
            Some(tok) => tok,
            None => return 0,
        };

        match &tok.token {
            Token::Word(w) => match w.keyword {
                Some(Keyword::OR) => Self::OR_PREC,
                Some(Keyword::AND) => Self::AND_PREC,
                Some(Keyword::IS) => Self::IS_PREC,
                _ => 0,
            },
            Token::Eq | Token::Neq | Token::Lt | Token::LtEq | Token::Gt | Token::GtEq => {
                Self::CMP_PREC
            }
            Token::Plus | Token::Minus => Self::PLUS_MINUS_PREC,
            Token::Mul | Token::Div | Token::Mod => Self::MUL_DIV_MOD_PREC,
            _ => 0,
        }
    }

    /// Walk this expression and all children, pre-order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::UnaryExpr { expr, .. } | Expr::IsNull { expr, .. } | Expr::Nested(expr) => {
                expr.walk(f)
            }
            Expr::BinaryExpr { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Expr::Function { args, .. } => {
                for arg in args {
                    if let FunctionArg::Expr(expr) = arg {
                        expr.walk(f);
                    }
                }
            }
            Expr::Ident(_) | Expr::CompoundIdent(_) | Expr::Literal(_) => (),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(ident) => write!(f, "{ident}"),
            Expr::CompoundIdent(idents) => {
                let strs: Vec<_> = idents.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", strs.join("."))
            }
            Expr::Literal(lit) => write!(f, "{lit}"),
            Expr::UnaryExpr { op, expr } => write!(f, "{op}{expr}"),
            Expr::BinaryExpr { left, op, right } => write!(f, "{left} {op} {right}"),
            Expr::IsNull {
                expr,
                negated: false,
            } => write!(f, "{expr} IS NULL"),
            Expr::IsNull {
                expr,
                negated: true,
            } => write!(f, "{expr} IS NOT NULL"),
            Expr::Function { name, args } => {
                let strs: Vec<_> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", name.normalized(), strs.join(", "))
            }
            Expr::Nested(expr) => write!(f, "({expr})"),
        }
    }
}
