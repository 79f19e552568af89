//! Resolved metadata for the tables a query may reference, and the scanning
//! capability used to read (and optionally write) them.
pub mod memory;
pub mod scanner;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use memory::MemTable;
pub use scanner::{Mutator, Scanner};

use crate::errors::{ExecError, Result};
use crate::scalar::{Row, ScalarValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Boolean,
    Int64,
    Float64,
    Utf8,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "Boolean"),
            DataType::Int64 => write!(f, "Int64"),
            DataType::Float64 => write!(f, "Float64"),
            DataType::Utf8 => write!(f, "Utf8"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub datatype: DataType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        ColumnDef {
            name: name.into(),
            datatype,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: impl IntoIterator<Item = ColumnDef>) -> Self {
        TableSchema {
            name: name.into(),
            columns: columns.into_iter().collect(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// A named collection of tables.
#[derive(Debug, Default)]
pub struct Schema {
    pub name: String,
    tables: IndexMap<String, Arc<dyn Scanner>>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Schema {
            name: name.into(),
            tables: IndexMap::new(),
        }
    }

    /// Add a table, replacing any existing table with the same name.
    pub fn with_table(mut self, table: Arc<dyn Scanner>) -> Self {
        self.add_table(table);
        self
    }

    pub fn add_table(&mut self, table: Arc<dyn Scanner>) {
        let name = table.table_schema().name.to_lowercase();
        self.tables.insert(name, table);
    }

    /// Look up a table by name. Names are case insensitive.
    pub fn table(&self, name: &str) -> Option<&Arc<dyn Scanner>> {
        self.tables.get(&name.to_lowercase())
    }

    /// Iterate tables in the order they were added.
    pub fn tables(&self) -> impl Iterator<Item = &Arc<dyn Scanner>> {
        self.tables.values()
    }
}

/// Serialized form of a table, including its rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Serialized form of a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDef {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<TableDef>,
}

/// Serialized set of schemas, e.g. loaded from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDef {
    #[serde(default)]
    pub schemas: Vec<SchemaDef>,
}

impl CatalogDef {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| ExecError::Plan(format!("Invalid catalog: {e}")))
    }

    /// Build an in-memory schema from a serialized schema definition.
    pub fn build_schema(&self, name: &str) -> Result<Schema> {
        let def = self
            .schemas
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ExecError::Plan(format!("Missing schema: {name}")))?;

        let mut schema = Schema::new(&def.name);
        for table in &def.tables {
            let rows = table
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(ScalarValue::from_json)
                        .collect::<Result<Vec<_>>>()
                        .map(Row::new)
                })
                .collect::<Result<Vec<_>>>()?;

            let mem = MemTable::new(TableSchema::new(&table.name, table.columns.clone()));
            mem.insert_rows(rows)?;
            schema.add_table(Arc::new(mem));
        }

        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_from_json() {
        let catalog = CatalogDef::from_json(
            r#"{
              "schemas": [{
                "name": "main",
                "tables": [{
                  "name": "Users",
                  "columns": [
                    {"name": "id", "datatype": "int64"},
                    {"name": "name", "datatype": "utf8"}
                  ],
                  "rows": [[1, "a"], [2, "b"]]
                }]
              }]
            }"#,
        )
        .unwrap();

        let schema = catalog.build_schema("MAIN").unwrap();
        let users = schema.table("users").unwrap();
        assert_eq!(Some(1), users.table_schema().column_index("NAME"));
        assert_eq!(2, users.scan().unwrap().len());

        catalog.build_schema("other").unwrap_err();
    }

    #[test]
    fn catalog_row_type_mismatch() {
        let catalog = CatalogDef::from_json(
            r#"{"schemas": [{"name": "main", "tables": [{
                "name": "t",
                "columns": [{"name": "id", "datatype": "int64"}],
                "rows": [["x"]]
            }]}]}"#,
        )
        .unwrap();
        catalog.build_schema("main").unwrap_err();
    }
}
