use std::fmt;

use crate::errors::{ExecError, Result};
use crate::schema::TableSchema;

/// A column flowing out of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutColumn {
    /// Binding name of the relation this column came from. `None` for
    /// computed columns.
    pub relation: Option<String>,
    pub name: String,
}

impl LayoutColumn {
    pub fn new(relation: Option<String>, name: impl Into<String>) -> Self {
        LayoutColumn {
            relation,
            name: name.into(),
        }
    }
}

impl fmt::Display for LayoutColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.relation {
            Some(rel) => write!(f, "{rel}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Ordered columns of the rows flowing out of a task, used to bind column
/// references to row positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    pub columns: Vec<LayoutColumn>,
}

impl ColumnLayout {
    pub fn new(columns: Vec<LayoutColumn>) -> Self {
        ColumnLayout { columns }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Layout for a scan of a table, qualified by the name the query binds
    /// the table to.
    pub fn from_table(binding: &str, schema: &TableSchema) -> Self {
        let columns = schema
            .columns
            .iter()
            .map(|c| LayoutColumn::new(Some(binding.to_string()), c.name.to_lowercase()))
            .collect();
        ColumnLayout { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Layout of `self` followed by `other`, for joins.
    pub fn concat(&self, other: &ColumnLayout) -> ColumnLayout {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        ColumnLayout { columns }
    }

    /// Resolve a possibly qualified column name to its position.
    pub fn resolve(&self, relation: Option<&str>, name: &str) -> Result<usize> {
        let mut found = None;
        for (idx, col) in self.columns.iter().enumerate() {
            if !col.name.eq_ignore_ascii_case(name) {
                continue;
            }
            if let Some(relation) = relation {
                match &col.relation {
                    Some(rel) if rel.eq_ignore_ascii_case(relation) => (),
                    _ => continue,
                }
            }
            if found.is_some() {
                return Err(ExecError::AmbiguousColumn {
                    column: qualified(relation, name),
                });
            }
            found = Some(idx);
        }

        found.ok_or_else(|| ExecError::ColumnNotFound {
            column: qualified(relation, name),
        })
    }

    /// Find a computed column whose name is the display of an expression,
    /// e.g. the output of an aggregate.
    pub fn find_computed(&self, display: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.relation.is_none() && c.name.eq_ignore_ascii_case(display))
    }

    /// Positions of all columns belonging to a relation.
    pub fn relation_columns(&self, relation: &str) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.relation
                    .as_deref()
                    .is_some_and(|r| r.eq_ignore_ascii_case(relation))
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

fn qualified(relation: Option<&str>, name: &str) -> String {
    match relation {
        Some(rel) => format!("{rel}.{name}"),
        None => name.to_string(),
    }
}
