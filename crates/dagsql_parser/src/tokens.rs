use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::errors::{ParseError, Result};
use crate::keywords::{keyword_from_str, Keyword};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub value: String,
    /// Quote character if this was a delimited identifier.
    pub quote: Option<char>,
    /// Keyword this word matches. Always None for quoted words.
    pub keyword: Option<Keyword>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(Word),
    /// Unparsed number literal.
    Number(String),
    /// 'string'
    SingleQuotedString(String),
    Comma,
    Period,
    SemiColon,
    LeftParen,
    RightParen,
    Eq,
    /// `!=` or `<>`
    Neq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => match w.quote {
                Some(q) => write!(f, "{q}{}{q}", w.value),
                None => write!(f, "{}", w.value),
            },
            Token::Number(n) => write!(f, "{n}"),
            Token::SingleQuotedString(s) => write!(f, "'{s}'"),
            Token::Comma => write!(f, ","),
            Token::Period => write!(f, "."),
            Token::SemiColon => write!(f, ";"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Eq => write!(f, "="),
            Token::Neq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::LtEq => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::GtEq => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Mul => write!(f, "*"),
            Token::Div => write!(f, "/"),
            Token::Mod => write!(f, "%"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenWithLocation {
    pub token: Token,
    /// Byte offset of the start of the token.
    pub offset: usize,
}

impl TokenWithLocation {
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        match &self.token {
            Token::Word(w) => w.keyword == Some(keyword),
            _ => false,
        }
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match &self.token {
            Token::Word(w) => w.keyword,
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Tokenizer<'a> {
    query: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(query: &'a str) -> Self {
        Tokenizer {
            query,
            chars: query.char_indices().peekable(),
        }
    }

    /// Tokenize the full query. Whitespace and comments are dropped.
    pub fn tokenize(mut self) -> Result<Vec<TokenWithLocation>> {
        let mut toks = Vec::new();
        while let Some(tok) = self.next_token()? {
            toks.push(tok);
        }
        Ok(toks)
    }

    fn next_token(&mut self) -> Result<Option<TokenWithLocation>> {
        loop {
            let (offset, c) = match self.chars.next() {
                Some(next) => next,
                None => return Ok(None),
            };

            let token = match c {
                c if c.is_whitespace() => continue,
                '-' => {
                    if self.next_if_eq('-') {
                        // Line comment.
                        while let Some((_, c)) = self.chars.next() {
                            if c == '\n' {
                                break;
                            }
                        }
                        continue;
                    }
                    Token::Minus
                }
                ',' => Token::Comma,
                '.' => Token::Period,
                ';' => Token::SemiColon,
                '(' => Token::LeftParen,
                ')' => Token::RightParen,
                '+' => Token::Plus,
                '*' => Token::Mul,
                '/' => Token::Div,
                '%' => Token::Mod,
                '=' => {
                    // Accept `==` as well.
                    self.next_if_eq('=');
                    Token::Eq
                }
                '!' => {
                    if self.next_if_eq('=') {
                        Token::Neq
                    } else {
                        return Err(ParseError::with_offset("Expected '=' after '!'", offset));
                    }
                }
                '<' => {
                    if self.next_if_eq('=') {
                        Token::LtEq
                    } else if self.next_if_eq('>') {
                        Token::Neq
                    } else {
                        Token::Lt
                    }
                }
                '>' => {
                    if self.next_if_eq('=') {
                        Token::GtEq
                    } else {
                        Token::Gt
                    }
                }
                '\'' => Token::SingleQuotedString(self.take_quoted('\'', offset)?),
                '"' => Token::Word(Word {
                    value: self.take_quoted('"', offset)?,
                    quote: Some('"'),
                    keyword: None,
                }),
                c if c.is_ascii_digit() => Token::Number(self.take_number(offset)),
                c if c.is_alphabetic() || c == '_' => {
                    let end = self.take_while(|c| c.is_alphanumeric() || c == '_');
                    let value = &self.query[offset..end];
                    Token::Word(Word {
                        value: value.to_string(),
                        quote: None,
                        keyword: keyword_from_str(value),
                    })
                }
                other => {
                    return Err(ParseError::with_offset(
                        format!("Unexpected character '{other}'"),
                        offset,
                    ))
                }
            };

            return Ok(Some(TokenWithLocation { token, offset }));
        }
    }

    fn next_if_eq(&mut self, expected: char) -> bool {
        self.chars.next_if(|(_, c)| *c == expected).is_some()
    }

    /// Consume chars while `pred` holds, returning the end byte offset.
    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        while self.chars.next_if(|(_, c)| pred(*c)).is_some() {}
        match self.chars.peek() {
            Some((idx, _)) => *idx,
            None => self.query.len(),
        }
    }

    fn take_number(&mut self, start: usize) -> String {
        let mut end = self.take_while(|c| c.is_ascii_digit());
        if self.next_if_eq('.') {
            end = self.take_while(|c| c.is_ascii_digit());
        }
        self.query[start..end].to_string()
    }

    /// Read a quoted string, the opening quote having already been consumed.
    ///
    /// A doubled quote char is an escaped quote.
    fn take_quoted(&mut self, quote: char, start: usize) -> Result<String> {
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == quote => {
                    if self.next_if_eq(quote) {
                        s.push(quote);
                    } else {
                        return Ok(s);
                    }
                }
                Some((_, c)) => s.push(c),
                None => {
                    return Err(ParseError::with_offset(
                        format!("Unterminated quoted string, missing {quote}"),
                        start,
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(s: &str) -> Vec<Token> {
        Tokenizer::new(s)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn tokenize_select() {
        let toks = tokens("select a, 1.5 from t where b <> 'it''s' -- trailing");
        assert_eq!(
            vec![
                Token::Word(Word {
                    value: "select".to_string(),
                    quote: None,
                    keyword: Some(Keyword::SELECT),
                }),
                Token::Word(Word {
                    value: "a".to_string(),
                    quote: None,
                    keyword: None,
                }),
                Token::Comma,
                Token::Number("1.5".to_string()),
                Token::Word(Word {
                    value: "from".to_string(),
                    quote: None,
                    keyword: Some(Keyword::FROM),
                }),
                Token::Word(Word {
                    value: "t".to_string(),
                    quote: None,
                    keyword: None,
                }),
                Token::Word(Word {
                    value: "where".to_string(),
                    quote: None,
                    keyword: Some(Keyword::WHERE),
                }),
                Token::Word(Word {
                    value: "b".to_string(),
                    quote: None,
                    keyword: None,
                }),
                Token::Neq,
                Token::SingleQuotedString("it's".to_string()),
            ],
            toks
        );
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert!(tokens("   \n\t -- nothing here").is_empty());
    }

    #[test]
    fn unterminated_string() {
        let err = Tokenizer::new("select 'abc").tokenize().unwrap_err();
        assert_eq!(Some(7), err.offset);
    }

    #[test]
    fn quoted_ident_is_not_keyword() {
        let toks = tokens("\"select\"");
        assert_eq!(
            vec![Token::Word(Word {
                value: "select".to_string(),
                quote: Some('"'),
                keyword: None,
            })],
            toks
        );
    }
}
