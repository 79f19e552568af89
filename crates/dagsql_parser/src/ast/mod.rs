pub mod expr;
pub use expr::*;
pub mod from;
pub use from::*;
pub mod modify;
pub use modify::*;
pub mod select;
pub use select::*;
pub mod utility;
pub use utility::*;

use std::fmt;

use crate::errors::{ParseError, Result};
use crate::parser::Parser;
use crate::tokens::Token;

pub trait AstParseable: Sized {
    /// Parse an instance of Self from the provided parser.
    ///
    /// It's assumed that the parser is in the correct state for parsing Self,
    /// and if it isn't, an error should be returned.
    fn parse(parser: &mut Parser) -> Result<Self>;
}


#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ident {
    pub value: String,
    pub quoted: bool,
}

impl Ident {
    pub fn new(s: impl Into<String>) -> Self {
        Ident {
            value: s.into(),
            quoted: false,
        }
    }

    /// Normalized name used for lookups. Unquoted identifiers are case
    /// insensitive.
    pub fn normalized(&self) -> String {
        if self.quoted {
            self.value.clone()
        } else {
            self.value.to_lowercase()
        }
    }
}

impl AstParseable for Ident {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let tok = parser.next_or_err("identifier")?;
        match &tok.token {
            Token::Word(w) => match w.keyword {
                Some(kw) if kw.is_reserved() => Err(ParseError::with_offset(
                    format!("Expected an identifier, got reserved keyword {kw:?}"),
                    tok.offset,
                )),
                _ => Ok(Ident {
                    value: w.value.clone(),
                    quoted: w.quote.is_some(),
                }),
            },
            other => Err(ParseError::with_offset(
                format!("Unexpected token: {other}. Expected an identifier."),
                tok.offset,
            )),
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.value.replace('"', "\"\""))
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// A possibly qualified reference to a table or other object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectReference(pub Vec<Ident>);

impl ObjectReference {
    pub fn from_strs(strs: &[&str]) -> Self {
        ObjectReference(strs.iter().map(|s| Ident::new(*s)).collect())
    }

    /// Last part of the reference, e.g. the table name in `schema.table`.
    pub fn base(&self) -> Option<&Ident> {
        self.0.last()
    }
}

impl AstParseable for ObjectReference {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let mut idents = vec![Ident::parse(parser)?];
        while parser.consume_token(&Token::Period) {
            idents.push(Ident::parse(parser)?);
        }
        Ok(ObjectReference(idents))
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strs: Vec<_> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", strs.join("."))
    }
}
