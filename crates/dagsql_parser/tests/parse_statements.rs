use dagsql_parser::ast::{JoinType, ObjectReference, SelectExpr, ShowNode};
use dagsql_parser::{parse, parse_with_source};
use dagsql_parser::statement::Statement;

/// Parse a string that must contain exactly one statement.
fn parse_one(s: &str) -> Statement {
    let mut stmts = parse(s).unwrap();
    assert_eq!(1, stmts.len(), "expected one statement for {s}");
    stmts.remove(0)
}

#[test]
fn empty_is_error() {
    let err = parse("").unwrap_err();
    assert_eq!("Empty SQL statement", err.msg);

    parse("   \n  ").unwrap_err();
    parse("-- just a comment").unwrap_err();
}

#[test]
fn only_separators_is_no_statements() {
    assert!(parse(";;").unwrap().is_empty());
}

#[test]
fn select_with_where() {
    match parse_one("SELECT name FROM users WHERE id = 5") {
        Statement::Select(select) => {
            assert_eq!(1, select.projections.len());
            let from = select.from.unwrap();
            assert_eq!(ObjectReference::from_strs(&["users"]), from.source.reference);
            assert_eq!("id = 5", select.where_expr.unwrap().to_string());
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn select_join() {
    match parse_one("SELECT a.x, b.y FROM a JOIN b ON a.id = b.id") {
        Statement::Select(select) => {
            let from = select.from.unwrap();
            assert_eq!(1, from.joins.len());
            assert_eq!(JoinType::Inner, from.joins[0].join_type);
            assert_eq!("a.id = b.id", from.joins[0].on.to_string());
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn select_into() {
    match parse_one("select * into archive from users") {
        Statement::Into { target, select } => {
            assert_eq!(ObjectReference::from_strs(&["archive"]), target);
            assert_eq!(vec![SelectExpr::Wildcard], select.projections);
            assert!(select.into.is_none());
        }
        other => panic!("unexpected statement: {other:?}"),
    }
}

#[test]
fn statement_kinds() {
    let cases = [
        ("insert into t values (1)", "INSERT"),
        ("upsert into t (a) values (1)", "UPSERT"),
        ("update t set a = 1", "UPDATE"),
        ("delete from t where a = 1", "DELETE"),
        ("show tables", "SHOW"),
        ("describe t", "DESCRIBE"),
        ("desc t", "DESCRIBE"),
        ("set channel_buffer = 8", "COMMAND"),
        ("prepare q from 'select 1'", "PREPARE"),
    ];

    for (sql, kind) in cases {
        assert_eq!(kind, parse_one(sql).kind(), "sql: {sql}");
    }
}

#[test]
fn show_tables() {
    assert_eq!(Statement::Show(ShowNode::Tables), parse_one("SHOW TABLES;"));
}

#[test]
fn error_has_offset() {
    let err = parse("select a from").unwrap_err();
    assert_eq!(None, err.offset);

    let err = parse("select a from t where ,").unwrap_err();
    assert_eq!(Some(22), err.offset);
}

#[test]
fn unknown_statement() {
    parse("explain select 1").unwrap_err();
    parse("grant all").unwrap_err();
}

#[test]
fn quoted_ident_with_embedded_quote() {
    let sql = r#"SELECT "a""b" FROM t"#;
    let stmt = parse_one(sql);
    let rendered = stmt.to_string();
    assert_eq!(sql, rendered);
    assert_eq!(stmt, parse_one(&rendered));
}

#[test]
fn statements_keep_source_text() {
    let sql = "select  \"x\"\"y\" from t ;\n\n-- next\nSHOW TABLES;;delete from t where id = 1\n";
    let stmts = parse_with_source(sql).unwrap();
    let texts: Vec<_> = stmts.iter().map(|(_, text)| *text).collect();
    assert_eq!(
        vec![
            "select  \"x\"\"y\" from t",
            "SHOW TABLES",
            "delete from t where id = 1",
        ],
        texts
    );
    assert!(matches!(stmts[1].0, Statement::Show(ShowNode::Tables)));
}

#[test]
fn source_text_of_empty_input() {
    assert!(parse_with_source(";").unwrap().is_empty());
    parse_with_source(" ").unwrap_err();
}
