use std::fmt;

use crate::errors::{ExecError, Result};

/// Ordered list of errors from independent steps that should all be
/// reported together.
///
/// An empty list means no error.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<ExecError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error. No-op on `None`.
    pub fn append(&mut self, err: Option<ExecError>) {
        if let Some(err) = err {
            self.errors.push(err);
        }
    }

    /// Append the error from a result if there is one, returning the value
    /// otherwise.
    pub fn append_result<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.errors.push(e);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecError> {
        self.errors.iter()
    }

    /// Reduce to a single error.
    ///
    /// A single error is returned as is. Multiple errors are reduced to an
    /// `Aggregate` error with each message joined by a newline, losing the
    /// individual error kinds.
    pub fn error(mut self) -> Option<ExecError> {
        match self.errors.len() {
            0 => None,
            1 => self.errors.pop(),
            _ => Some(ExecError::Aggregate(self.joined_messages())),
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self.error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn joined_messages(&self) -> String {
        let msgs: Vec<_> = self.errors.iter().map(|e| e.to_string()).collect();
        msgs.join("\n")
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.joined_messages())
    }
}

impl IntoIterator for ErrorList {
    type Item = ExecError;
    type IntoIter = std::vec::IntoIter<ExecError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn empty_is_none() {
        let mut errs = ErrorList::new();
        errs.append(None);
        assert!(errs.is_empty());
        assert!(errs.error().is_none());
    }

    #[test]
    fn single_keeps_kind() {
        let mut errs = ErrorList::new();
        errs.append(Some(ExecError::NoSchemaSelected));
        let err = errs.error().unwrap();
        assert_eq!(ErrorKind::Compile, err.kind());
        assert_eq!("No schema selected", err.to_string());
    }

    #[test]
    fn multiple_joined_in_order() {
        let mut errs = ErrorList::new();
        errs.append(Some(ExecError::TableNotFound {
            table: "a".to_string(),
        }));
        assert_eq!(None, errs.append_result::<()>(Err(ExecError::NoSchemaSelected)));
        assert_eq!(Some(3), errs.append_result(Ok(3)));
        errs.append(Some(ExecError::ShuttingDown));

        assert_eq!(3, errs.len());
        let err = errs.error().unwrap();
        assert_eq!(ErrorKind::Aggregate, err.kind());
        assert_eq!(
            "Missing table: a\nNo schema selected\nReceived shutdown signal",
            err.to_string()
        );
    }
}
