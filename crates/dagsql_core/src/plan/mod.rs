pub mod layout;
pub mod planner;

use std::sync::Arc;

use dagsql_parser::ast::{Expr, ObjectReference, TableRef};

use crate::context::Context;
use crate::errors::{ExecError, Result};
use crate::schema::Scanner;
use layout::ColumnLayout;

/// Everything resolved about a single source of a statement.
#[derive(Debug, Clone)]
pub struct SourcePlan {
    /// Name the rest of the query refers to this source by.
    pub binding: String,
    pub scanner: Arc<dyn Scanner>,
    /// Columns produced by scanning this source.
    pub layout: ColumnLayout,
    /// Filter that only references this source.
    pub filter: Option<Expr>,
}

impl SourcePlan {
    pub fn resolve(ctx: &Context, table: &TableRef) -> Result<SourcePlan> {
        let scanner = resolve_table(ctx, &table.reference)?;
        let binding = table.binding_name();
        let layout = ColumnLayout::from_table(&binding, scanner.table_schema());
        Ok(SourcePlan {
            binding,
            scanner,
            layout,
            filter: None,
        })
    }
}

/// Find a table in the context's schema.
///
/// References may be qualified with the schema name.
pub fn resolve_table(ctx: &Context, reference: &ObjectReference) -> Result<Arc<dyn Scanner>> {
    let schema = ctx.schema().ok_or(ExecError::NoSchemaSelected)?;
    let missing = || ExecError::TableNotFound {
        table: reference.to_string(),
    };

    let table = match reference.0.as_slice() {
        [table] => table,
        [schema_name, table] if schema_name.normalized().eq_ignore_ascii_case(&schema.name) => {
            table
        }
        _ => return Err(missing()),
    };

    schema.table(&table.normalized()).cloned().ok_or_else(missing)
}
