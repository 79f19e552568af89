#![allow(dead_code)]

use std::sync::Arc;

use dagsql_core::config::ExecConfig;
use dagsql_core::scalar::Row;
use dagsql_core::schema::{ColumnDef, DataType, MemTable, Schema, TableSchema};
use dagsql_core::{build_sql_job, Context, Result};

/// Schema with `users(id, name)`, `a(id, x)` and `b(id, y)`.
pub fn test_schema() -> Arc<Schema> {
    let users = MemTable::with_rows(
        TableSchema::new(
            "users",
            [
                ColumnDef::new("id", DataType::Int64),
                ColumnDef::new("name", DataType::Utf8),
            ],
        ),
        vec![
            Row::new(vec![1.into(), "ada".into()]),
            Row::new(vec![5.into(), "bob".into()]),
            Row::new(vec![7.into(), "ada".into()]),
            Row::new(vec![5.into(), "cy".into()]),
        ],
    )
    .unwrap();

    let a = MemTable::with_rows(
        TableSchema::new(
            "a",
            [
                ColumnDef::new("id", DataType::Int64),
                ColumnDef::new("x", DataType::Utf8),
            ],
        ),
        vec![
            Row::new(vec![1.into(), "a1".into()]),
            Row::new(vec![2.into(), "a2".into()]),
            Row::new(vec![3.into(), "a3".into()]),
        ],
    )
    .unwrap();

    let b = MemTable::with_rows(
        TableSchema::new(
            "b",
            [
                ColumnDef::new("id", DataType::Int64),
                ColumnDef::new("y", DataType::Int64),
            ],
        ),
        vec![
            Row::new(vec![1.into(), 10.into()]),
            Row::new(vec![3.into(), 30.into()]),
            Row::new(vec![3.into(), 31.into()]),
        ],
    )
    .unwrap();

    Arc::new(
        Schema::new("main")
            .with_table(Arc::new(users))
            .with_table(Arc::new(a))
            .with_table(Arc::new(b)),
    )
}

pub fn context(sql: &str, schema: &Arc<Schema>) -> Arc<Context> {
    logutil::init_test();
    Arc::new(Context::new(sql).with_schema(schema.clone()))
}

pub fn context_with_config(sql: &str, schema: &Arc<Schema>, config: ExecConfig) -> Arc<Context> {
    logutil::init_test();
    Arc::new(
        Context::new(sql)
            .with_schema(schema.clone())
            .with_config(config),
    )
}

/// Compile, set up, run and close a job, returning every drained row.
pub async fn query(sql: &str, schema: &Arc<Schema>) -> Result<Vec<Row>> {
    let mut job = build_sql_job(context(sql, schema))?;
    job.setup()?;
    let rows = job.collect().await?;
    job.close()?;
    Ok(rows)
}
