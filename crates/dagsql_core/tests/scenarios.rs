mod common;

use std::sync::Arc;

use common::{query, test_schema};
use dagsql_core::errors::ErrorKind;
use dagsql_core::rel::TaskRunner;
use dagsql_core::scalar::{Row, ScalarValue};
use dagsql_core::{build_sql_job, build_sql_job_with, Context, ExecError, MetadataVisitor};

#[tokio::test]
async fn filter_single_source() {
    let schema = test_schema();
    let mut job =
        build_sql_job(common::context("SELECT name FROM users WHERE id = 5", &schema)).unwrap();
    job.setup().unwrap();
    let rows = job.collect().await.unwrap();
    job.close().unwrap();

    assert_eq!(
        vec![
            Row::new(vec!["bob".into()]),
            Row::new(vec!["cy".into()]),
        ],
        rows
    );
}

#[tokio::test]
async fn join_has_one_child_per_source() {
    let schema = test_schema();
    let job = build_sql_job(common::context(
        "SELECT a.x, b.y FROM a JOIN b ON a.id = b.id",
        &schema,
    ))
    .unwrap();

    let root = job.root().unwrap();
    let join = &root.children()[0];
    assert_eq!("join(inner)", join.name());
    assert_eq!(2, join.children().len());
    assert_eq!("join_side(a)", join.children()[0].name());
    assert_eq!("join_side(b)", join.children()[1].name());

    let rows = query("SELECT a.x, b.y FROM a JOIN b ON a.id = b.id", &schema)
        .await
        .unwrap();
    assert_eq!(
        vec![
            Row::new(vec!["a1".into(), 10.into()]),
            Row::new(vec!["a3".into(), 30.into()]),
            Row::new(vec!["a3".into(), 31.into()]),
        ],
        rows
    );
}

#[tokio::test]
async fn show_needs_override_visitor() {
    let schema = test_schema();
    let err = build_sql_job(common::context("SHOW TABLES", &schema)).unwrap_err();
    assert!(matches!(err, ExecError::NotImplemented { statement: "SHOW" }), "{err}");
    assert_eq!(ErrorKind::UnsupportedStatement, err.kind());

    let ctx = common::context("SHOW TABLES", &schema);
    let mut job = build_sql_job_with(ctx.clone(), Box::new(MetadataVisitor::new(&ctx))).unwrap();
    job.setup().unwrap();
    let rows = job.collect().await.unwrap();
    assert_eq!(
        vec![
            Row::new(vec!["users".into()]),
            Row::new(vec!["a".into()]),
            Row::new(vec!["b".into()]),
        ],
        rows
    );
}

#[test]
fn unsupported_statements() {
    let schema = test_schema();
    for (sql, statement) in [
        ("select * into t2 from users", "INTO"),
        ("prepare p from 'select 1'", "PREPARE"),
        ("set disable_recover = true", "COMMAND"),
        ("describe users", "DESCRIBE"),
    ] {
        let err = build_sql_job(common::context(sql, &schema)).unwrap_err();
        match err {
            ExecError::NotImplemented { statement: s } => assert_eq!(statement, s),
            other => panic!("{sql}: unexpected error {other}"),
        }
    }
}

#[test]
fn missing_schema() {
    let ctx = Arc::new(Context::new("SELECT name FROM users"));
    let err = build_sql_job(ctx.clone()).unwrap_err();
    assert!(matches!(err, ExecError::NoSchemaSelected), "{err}");
    assert_eq!(ErrorKind::Compile, err.kind());
    assert_eq!("No schema selected", err.to_string());
    // Parsing succeeded before resolution failed.
    assert_eq!("SELECT", ctx.statement().unwrap().kind());
}

#[tokio::test]
async fn select_without_from() {
    let rows = query("select 1 + 2, 'x' as s, null", &test_schema())
        .await
        .unwrap();
    assert_eq!(
        vec![Row::new(vec![3.into(), "x".into(), ScalarValue::Null])],
        rows
    );
}

#[tokio::test]
async fn left_join_pads_nulls() {
    let rows = query(
        "select a.id, b.y from a left join b on a.id = b.id where a.id < 3",
        &test_schema(),
    )
    .await
    .unwrap();
    assert_eq!(
        vec![
            Row::new(vec![1.into(), 10.into()]),
            Row::new(vec![2.into(), ScalarValue::Null]),
        ],
        rows
    );
}

#[tokio::test]
async fn ambiguous_join_column() {
    let err = query("select id from a join b on a.id = b.id", &test_schema())
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::AmbiguousColumn { .. }), "{err}");
}

#[tokio::test]
async fn group_by_with_having() {
    let rows = query(
        "select name, count(*), sum(id) from users group by name having count(*) > 1",
        &test_schema(),
    )
    .await
    .unwrap();
    assert_eq!(vec![Row::new(vec!["ada".into(), 2.into(), 8.into()])], rows);
}

#[tokio::test]
async fn aggregate_without_group_by() {
    let schema = test_schema();
    let rows = query("select count(*), min(id), max(id) from users", &schema)
        .await
        .unwrap();
    assert_eq!(vec![Row::new(vec![4.into(), 1.into(), 7.into()])], rows);

    let rows = query("select count(*) from users where id > 100", &schema)
        .await
        .unwrap();
    assert_eq!(vec![Row::new(vec![0.into()])], rows);
}

#[tokio::test]
async fn distinct_values() {
    let rows = query("select distinct name from users", &test_schema())
        .await
        .unwrap();
    assert_eq!(
        vec![
            Row::new(vec!["ada".into()]),
            Row::new(vec!["bob".into()]),
            Row::new(vec!["cy".into()]),
        ],
        rows
    );
}

#[tokio::test]
async fn qualified_wildcard() {
    let rows = query(
        "select b.* from a join b on a.id = b.id where b.y > 30",
        &test_schema(),
    )
    .await
    .unwrap();
    assert_eq!(vec![Row::new(vec![3.into(), 31.into()])], rows);
}

#[tokio::test]
async fn mutations() {
    let schema = test_schema();

    let rows = query("insert into users (id, name) values (10, 'dee'), (11, 'eve')", &schema)
        .await
        .unwrap();
    assert_eq!(vec![Row::new(vec![2.into()])], rows);

    let rows = query("upsert into users values (10, 'dot')", &schema)
        .await
        .unwrap();
    assert_eq!(vec![Row::new(vec![1.into()])], rows);

    let rows = query("update users set name = upper(name) where id >= 10", &schema)
        .await
        .unwrap();
    assert_eq!(vec![Row::new(vec![2.into()])], rows);

    let rows = query("select name from users where id >= 10", &schema)
        .await
        .unwrap();
    assert_eq!(
        vec![Row::new(vec!["DOT".into()]), Row::new(vec!["EVE".into()])],
        rows
    );

    let rows = query("delete from users where name = 'ada'", &schema)
        .await
        .unwrap();
    assert_eq!(vec![Row::new(vec![2.into()])], rows);

    let rows = query("select count(*) from users", &schema).await.unwrap();
    assert_eq!(vec![Row::new(vec![4.into()])], rows);
}

#[tokio::test]
async fn insert_unknown_column() {
    let err = query("insert into users (nope) values (1)", &test_schema())
        .await
        .unwrap_err();
    assert_eq!("Missing column: nope", err.to_string());
}

fn child_names(task: &dyn TaskRunner) -> Vec<&str> {
    task.children().iter().map(|c| c.name()).collect()
}

#[tokio::test]
async fn inner_join_filters_each_source() {
    let schema = test_schema();
    let sql = "select a.x, b.y from a join b on a.id = b.id where b.y > 30 and a.x = 'a3'";
    let job = build_sql_job(common::context(sql, &schema)).unwrap();

    let root = job.root().unwrap();
    assert_eq!(vec!["join(inner)", "projection"], child_names(root));
    let join = root.children()[0].as_ref();
    assert_eq!(vec!["source(a)", "filter"], child_names(join.children()[0].as_ref()));
    assert_eq!(vec!["source(b)", "filter"], child_names(join.children()[1].as_ref()));

    let rows = query(sql, &schema).await.unwrap();
    assert_eq!(vec![Row::new(vec!["a3".into(), 31.into()])], rows);
}

#[tokio::test]
async fn join_filter_across_sources_stays_after_join() {
    let schema = test_schema();
    let sql = "select a.x from a join b on a.id = b.id where a.id + b.y > 33";
    let job = build_sql_job(common::context(sql, &schema)).unwrap();

    let root = job.root().unwrap();
    assert_eq!(vec!["join(inner)", "filter", "projection"], child_names(root));
    let join = root.children()[0].as_ref();
    assert_eq!(vec!["source(b)"], child_names(join.children()[1].as_ref()));

    let rows = query(sql, &schema).await.unwrap();
    assert_eq!(vec![Row::new(vec!["a3".into()])], rows);
}

#[tokio::test]
async fn left_join_filter_not_pushed() {
    let schema = test_schema();
    let sql = "select a.id from a left join b on a.id = b.id where b.y is null";
    let job = build_sql_job(common::context(sql, &schema)).unwrap();

    let root = job.root().unwrap();
    assert_eq!(vec!["join(left)", "filter", "projection"], child_names(root));
    let join = root.children()[0].as_ref();
    assert_eq!(vec!["source(b)"], child_names(join.children()[1].as_ref()));

    let rows = query(sql, &schema).await.unwrap();
    assert_eq!(vec![Row::new(vec![2.into()])], rows);
}
