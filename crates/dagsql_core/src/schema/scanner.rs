use std::fmt::Debug;

use super::TableSchema;
use crate::errors::Result;
use crate::scalar::Row;

/// Capability for reading rows from a single source.
///
/// The runtime treats this as opaque. Source tasks only rely on the table
/// schema for binding and on `scan` for producing rows.
pub trait Scanner: Debug + Sync + Send {
    fn table_schema(&self) -> &TableSchema;

    /// Snapshot all rows in the source.
    fn scan(&self) -> Result<Vec<Row>>;

    /// Write capability, if the source supports it.
    fn mutator(&self) -> Option<&dyn Mutator> {
        None
    }
}

/// Capability for modifying a source. Every method returns the number of
/// affected rows.
pub trait Mutator: Sync + Send {
    fn insert(&self, rows: Vec<Row>) -> Result<usize>;

    /// Insert rows, replacing existing rows with the same key. The key is the
    /// first column.
    fn upsert(&self, rows: Vec<Row>) -> Result<usize>;

    /// Update rows in place. The callback returns true if it modified the
    /// row.
    fn update(&self, f: &mut dyn FnMut(&mut Row) -> Result<bool>) -> Result<usize>;

    /// Delete rows the predicate returns true for.
    fn delete(&self, pred: &mut dyn FnMut(&Row) -> Result<bool>) -> Result<usize>;
}
