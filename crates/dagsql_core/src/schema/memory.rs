use parking_lot::RwLock;

use super::{Mutator, Scanner, TableSchema};
use crate::errors::{ExecError, Result};
use crate::scalar::Row;

/// In-memory table.
///
/// Mutations operate on a copy of the rows which is swapped in only once the
/// whole mutation succeeds.
#[derive(Debug)]
pub struct MemTable {
    schema: TableSchema,
    rows: RwLock<Vec<Row>>,
}

impl MemTable {
    pub fn new(schema: TableSchema) -> Self {
        MemTable {
            schema,
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn with_rows(schema: TableSchema, rows: Vec<Row>) -> Result<Self> {
        let table = Self::new(schema);
        table.insert_rows(rows)?;
        Ok(table)
    }

    pub fn insert_rows(&self, rows: Vec<Row>) -> Result<usize> {
        let rows = rows
            .into_iter()
            .map(|row| self.coerce(row))
            .collect::<Result<Vec<_>>>()?;

        let count = rows.len();
        self.rows.write().extend(rows);
        Ok(count)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.read().len()
    }

    /// Check the row width and cast each value to its column type.
    fn coerce(&self, row: Row) -> Result<Row> {
        if row.len() != self.schema.columns.len() {
            return Err(ExecError::Runtime(format!(
                "Table '{}' expects {} values per row, got {}",
                self.schema.name,
                self.schema.columns.len(),
                row.len()
            )));
        }

        row.0
            .into_iter()
            .zip(&self.schema.columns)
            .map(|(v, col)| v.cast_to(col.datatype))
            .collect::<Result<Vec<_>>>()
            .map(Row::new)
    }
}

impl Scanner for MemTable {
    fn table_schema(&self) -> &TableSchema {
        &self.schema
    }

    fn scan(&self) -> Result<Vec<Row>> {
        Ok(self.rows.read().clone())
    }

    fn mutator(&self) -> Option<&dyn Mutator> {
        Some(self)
    }
}

impl Mutator for MemTable {
    fn insert(&self, rows: Vec<Row>) -> Result<usize> {
        self.insert_rows(rows)
    }

    fn upsert(&self, rows: Vec<Row>) -> Result<usize> {
        let incoming = rows
            .into_iter()
            .map(|row| self.coerce(row))
            .collect::<Result<Vec<_>>>()?;

        let count = incoming.len();
        let mut rows = self.rows.write();
        for row in incoming {
            let key = row.get(0).cloned();
            match rows.iter_mut().find(|existing| existing.get(0).cloned() == key) {
                Some(existing) => *existing = row,
                None => rows.push(row),
            }
        }

        Ok(count)
    }

    fn update(&self, f: &mut dyn FnMut(&mut Row) -> Result<bool>) -> Result<usize> {
        let mut rows = self.rows.write();
        let mut updated = Vec::with_capacity(rows.len());
        let mut count = 0;

        for row in rows.iter() {
            let mut row = row.clone();
            if f(&mut row)? {
                row = self.coerce(row)?;
                count += 1;
            }
            updated.push(row);
        }

        *rows = updated;
        Ok(count)
    }

    fn delete(&self, pred: &mut dyn FnMut(&Row) -> Result<bool>) -> Result<usize> {
        let mut rows = self.rows.write();
        let mut kept = Vec::with_capacity(rows.len());

        for row in rows.iter() {
            if !pred(row)? {
                kept.push(row.clone());
            }
        }

        let count = rows.len() - kept.len();
        *rows = kept;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ScalarValue;
    use crate::schema::{ColumnDef, DataType};

    fn table() -> MemTable {
        MemTable::with_rows(
            TableSchema::new(
                "t",
                [
                    ColumnDef::new("id", DataType::Int64),
                    ColumnDef::new("v", DataType::Utf8),
                ],
            ),
            vec![
                Row::new(vec![1.into(), "a".into()]),
                Row::new(vec![2.into(), "b".into()]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn insert_wrong_width() {
        let t = table();
        t.insert(vec![Row::new(vec![ScalarValue::Int64(3)])])
            .unwrap_err();
        assert_eq!(2, t.num_rows());
    }

    #[test]
    fn upsert_replaces_by_key() {
        let t = table();
        let n = t
            .upsert(vec![
                Row::new(vec![2.into(), "z".into()]),
                Row::new(vec![3.into(), "c".into()]),
            ])
            .unwrap();
        assert_eq!(2, n);

        let rows = t.scan().unwrap();
        assert_eq!(3, rows.len());
        assert_eq!(Row::new(vec![2.into(), "z".into()]), rows[1]);
    }

    #[test]
    fn update_is_all_or_nothing() {
        let t = table();
        let err = t.update(&mut |row| {
            if row.get(0) == Some(&ScalarValue::Int64(2)) {
                return Err(ExecError::Runtime("boom".to_string()));
            }
            row.0[1] = "x".into();
            Ok(true)
        });
        err.unwrap_err();
        assert_eq!(Row::new(vec![1.into(), "a".into()]), t.scan().unwrap()[0]);
    }

    #[test]
    fn delete_matching() {
        let t = table();
        let n = t
            .delete(&mut |row| Ok(row.get(1) == Some(&ScalarValue::from("a"))))
            .unwrap();
        assert_eq!(1, n);
        assert_eq!(1, t.num_rows());
    }
}
