#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{msg}")]
pub struct ParseError {
    pub msg: String,
    /// Byte offset into the query where the error was detected, if known.
    pub offset: Option<usize>,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        ParseError {
            msg: msg.into(),
            offset: None,
        }
    }

    pub fn with_offset(msg: impl Into<String>, offset: usize) -> Self {
        ParseError {
            msg: msg.into(),
            offset: Some(offset),
        }
    }
}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;
