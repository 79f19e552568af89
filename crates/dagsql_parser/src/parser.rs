use std::ops::Range;

use crate::ast::{
    AstParseable, CommandNode, DeleteNode, DescribeNode, Ident, InsertNode, PrepareNode,
    SelectNode, ShowNode, UpdateNode,
};
use crate::errors::{ParseError, Result};
use crate::keywords::Keyword;
use crate::statement::Statement;
use crate::tokens::{Token, TokenWithLocation, Tokenizer};

#[derive(Debug)]
pub struct Parser {
    toks: Vec<TokenWithLocation>,
    /// Index of token we should process next.
    pub(crate) idx: usize,
}

impl Parser {
    pub fn with_tokens(toks: Vec<TokenWithLocation>) -> Self {
        Parser { toks, idx: 0 }
    }

    pub fn with_sql_string(sql: &str) -> Result<Self> {
        let toks = Tokenizer::new(sql).tokenize()?;
        Ok(Self::with_tokens(toks))
    }

    /// Parse all statements, separated by semicolons.
    pub fn parse_statements(&mut self) -> Result<Vec<Statement>> {
        let stmts = self.parse_statements_with_spans(usize::MAX)?;
        Ok(stmts.into_iter().map(|(stmt, _)| stmt).collect())
    }

    /// Parse all statements along with the byte range of the source text each
    /// was parsed from.
    ///
    /// A range ends at the statement's terminating semicolon, or at `end` for
    /// the last statement.
    pub fn parse_statements_with_spans(
        &mut self,
        end: usize,
    ) -> Result<Vec<(Statement, Range<usize>)>> {
        let mut stmts = Vec::new();
        loop {
            while self.consume_token(&Token::SemiColon) {}
            let start = match self.peek() {
                Some(tok) => tok.offset,
                None => break,
            };

            let stmt = self.parse_statement()?;
            let stmt_end = match self.peek() {
                Some(tok) => tok.offset,
                None => end,
            };
            stmts.push((stmt, start..stmt_end));

            if self.peek().is_none() {
                break;
            }
            if !self.consume_token(&Token::SemiColon) {
                return Err(self.unexpected("end of statement"));
            }
        }
        Ok(stmts)
    }

    pub fn parse_statement(&mut self) -> Result<Statement> {
        let tok = self.next_or_err("a SQL statement")?;
        let keyword = match tok.keyword() {
            Some(kw) => kw,
            None => {
                return Err(ParseError::with_offset(
                    format!("Expected a SQL statement, got {}", tok.token),
                    tok.offset,
                ))
            }
        };

        match keyword {
            Keyword::SELECT => {
                let select = SelectNode::parse(self)?;
                match select.into.clone() {
                    Some(target) => Ok(Statement::Into {
                        target,
                        select: SelectNode { into: None, ..select },
                    }),
                    None => Ok(Statement::Select(select)),
                }
            }
            Keyword::INSERT => {
                self.expect_keyword(Keyword::INTO)?;
                Ok(Statement::Insert(InsertNode::parse(self)?))
            }
            Keyword::UPSERT => {
                self.expect_keyword(Keyword::INTO)?;
                Ok(Statement::Upsert(InsertNode::parse(self)?))
            }
            Keyword::UPDATE => Ok(Statement::Update(UpdateNode::parse(self)?)),
            Keyword::DELETE => {
                self.expect_keyword(Keyword::FROM)?;
                Ok(Statement::Delete(DeleteNode::parse(self)?))
            }
            Keyword::SHOW => Ok(Statement::Show(ShowNode::parse(self)?)),
            Keyword::DESCRIBE | Keyword::DESC => Ok(Statement::Describe(DescribeNode::parse(self)?)),
            Keyword::SET => Ok(Statement::Command(CommandNode::parse(self)?)),
            Keyword::PREPARE => Ok(Statement::Prepared(PrepareNode::parse(self)?)),
            other => Err(ParseError::with_offset(
                format!("Unexpected keyword: {other:?}"),
                tok.offset,
            )),
        }
    }

    /// Parse a single keyword.
    pub fn parse_keyword(&mut self, keyword: Keyword) -> bool {
        let matches = self.peek().is_some_and(|tok| tok.is_keyword(keyword));
        if matches {
            self.idx += 1;
        }
        matches
    }

    /// Parse an exact sequence of keywords.
    ///
    /// If the sequence doesn't match, idx is not changed, and false is
    /// returned.
    pub fn parse_keyword_sequence(&mut self, keywords: &[Keyword]) -> bool {
        let idx = self.idx;
        for keyword in keywords {
            if !self.parse_keyword(*keyword) {
                // Keyword doesn't match. Reset index and return.
                self.idx = idx;
                return false;
            }
        }
        true
    }

    pub fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        if self.parse_keyword(keyword) {
            return Ok(());
        }
        Err(self.unexpected(&format!("{keyword:?}")))
    }

    /// Consume the next token if it matches `expected`.
    pub fn consume_token(&mut self, expected: &Token) -> bool {
        let matches = self.peek().is_some_and(|tok| &tok.token == expected);
        if matches {
            self.idx += 1;
        }
        matches
    }

    pub fn expect_token(&mut self, expected: &Token) -> Result<()> {
        if self.consume_token(expected) {
            return Ok(());
        }
        Err(self.unexpected(&format!("'{expected}'")))
    }

    /// Parse a comma separated list of items, requiring at least one.
    pub fn parse_comma_separated<T>(
        &mut self,
        mut f: impl FnMut(&mut Parser) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut values = vec![f(self)?];
        while self.consume_token(&Token::Comma) {
            values.push(f(self)?);
        }
        Ok(values)
    }

    /// Parse a parenthesized, comma separated list.
    pub fn parse_parenthesized<T>(
        &mut self,
        f: impl FnMut(&mut Parser) -> Result<T>,
    ) -> Result<Vec<T>> {
        self.expect_token(&Token::LeftParen)?;
        let values = self.parse_comma_separated(f)?;
        self.expect_token(&Token::RightParen)?;
        Ok(values)
    }

    /// Parse an optional alias, `AS <ident>` or a bare non-keyword ident.
    pub fn parse_alias(&mut self) -> Result<Option<Ident>> {
        if self.parse_keyword(Keyword::AS) {
            return Ok(Some(Ident::parse(self)?));
        }

        let bare_ident = matches!(
            self.peek().map(|t| &t.token),
            Some(Token::Word(w)) if w.keyword.is_none()
        );
        if bare_ident {
            Ok(Some(Ident::parse(self)?))
        } else {
            Ok(None)
        }
    }

    /// Peek the next token without consuming it.
    pub fn peek(&self) -> Option<&TokenWithLocation> {
        self.toks.get(self.idx)
    }

    /// Peek `n` tokens ahead of the next token.
    pub fn peek_nth(&self, n: usize) -> Option<&TokenWithLocation> {
        self.toks.get(self.idx + n)
    }

    /// Get the next token.
    pub fn next(&mut self) -> Option<TokenWithLocation> {
        let tok = self.toks.get(self.idx).cloned();
        if tok.is_some() {
            self.idx += 1;
        }
        tok
    }

    /// Get the next token, erroring if we're at the end of the statement.
    pub fn next_or_err(&mut self, expected: &str) -> Result<TokenWithLocation> {
        match self.next() {
            Some(tok) => Ok(tok),
            None => Err(ParseError::new(format!(
                "Expected {expected}, found end of statement"
            ))),
        }
    }

    /// Error for an unexpected next token.
    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(tok) => ParseError::with_offset(
                format!("Expected {expected}, got {}", tok.token),
                tok.offset,
            ),
            None => ParseError::new(format!("Expected {expected}, found end of statement")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_sequence_resets_on_mismatch() {
        let mut parser = Parser::with_sql_string("group order").unwrap();
        assert!(!parser.parse_keyword_sequence(&[Keyword::GROUP, Keyword::BY]));
        assert_eq!(0, parser.idx);
        assert!(parser.parse_keyword(Keyword::GROUP));
    }

    #[test]
    fn multiple_statements() {
        let mut parser = Parser::with_sql_string("show tables; ; describe t;").unwrap();
        let stmts = parser.parse_statements().unwrap();
        assert_eq!(2, stmts.len());
    }

    #[test]
    fn missing_separator() {
        let mut parser = Parser::with_sql_string("show tables show tables").unwrap();
        parser.parse_statements().unwrap_err();
    }
}
