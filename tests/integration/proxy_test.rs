//! End-to-end proxy tests.
//!
//! Runs statements shaped like the query builder's output through the
//! executor and checks the rows that come back.

use pretty_assertions::assert_eq;
use sqlite_proxy::error::ProxyError;
use sqlite_proxy::proxy::{Method, ProxyExecutor, Rows, Statement, StatementErrorPolicy};
use sqlite_proxy::storage::{Locator, SqliteEngine, SqliteEngineOptions, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};

use super::common::{users_proxy, CREATE_USERS};

const INSERT_USER: &str = "insert into \"users\" (\"id\", \"name\") values (null, ?)";
const SELECT_USERS: &str = "select \"id\", \"name\" from \"users\"";

#[tokio::test]
async fn test_insert_then_select_alice() {
    let (proxy, _dir) = users_proxy().await;

    let inserted = proxy
        .execute(INSERT_USER, &[Value::from("Alice")], Method::Run)
        .await
        .unwrap();
    assert_eq!(inserted.rows, Rows::Many(vec![]));

    let result = proxy
        .execute("SELECT * FROM users WHERE name = 'Alice'", &[], Method::All)
        .await
        .unwrap();
    assert_eq!(
        result.rows,
        Rows::Many(vec![vec![Value::Int(1), Value::from("Alice")]])
    );

    proxy
        .execute("delete from \"users\"", &[], Method::Run)
        .await
        .unwrap();

    let result = proxy
        .execute("SELECT * FROM users WHERE name = 'Alice'", &[], Method::All)
        .await
        .unwrap();
    assert_eq!(result.rows, Rows::Many(vec![]));
}

#[tokio::test]
async fn test_select_with_limit_param_for_existing_user() {
    let (proxy, _dir) = users_proxy().await;
    let lookup = "select \"id\", \"name\" from \"users\" where \"users\".\"name\" = ? limit ?";

    let before = proxy
        .execute(lookup, &[Value::from("Alice"), Value::Int(1)], Method::All)
        .await
        .unwrap();
    assert!(before.is_empty());

    proxy
        .execute(INSERT_USER, &[Value::from("Alice")], Method::Run)
        .await
        .unwrap();

    let after = proxy
        .execute(lookup, &[Value::from("Alice"), Value::Int(1)], Method::All)
        .await
        .unwrap();
    assert_eq!(after.len(), 1);
}

#[tokio::test]
async fn test_bulk_insert_row_count_matches() {
    let (proxy, _dir) = users_proxy().await;

    let placeholders = vec!["(null, ?)"; 50].join(", ");
    let sql = format!("insert into \"users\" (\"id\", \"name\") values {placeholders}");
    let names: Vec<Value> = (0..50).map(|i| Value::from(format!("User{i}"))).collect();

    let result = proxy.execute(&sql, &names, Method::Run).await.unwrap();
    assert_eq!(result.rows, Rows::Many(vec![]));

    let all = proxy.execute(SELECT_USERS, &[], Method::All).await.unwrap();
    assert_eq!(all.len(), 50);

    let Rows::Many(rows) = all.rows else {
        panic!("all-rows method returned a single row");
    };
    assert_eq!(rows[49], vec![Value::Int(50), Value::from("User49")]);
}

#[tokio::test]
async fn test_values_follow_select_column_order() {
    let (proxy, _dir) = users_proxy().await;
    proxy
        .execute(INSERT_USER, &[Value::from("Alice")], Method::Run)
        .await
        .unwrap();

    let result = proxy
        .execute("SELECT name, id FROM users", &[], Method::Values)
        .await
        .unwrap();
    assert_eq!(
        result.rows,
        Rows::Many(vec![vec![Value::from("Alice"), Value::Int(1)]])
    );
}

#[tokio::test]
async fn test_single_row_methods() {
    let (proxy, _dir) = users_proxy().await;

    let empty = proxy
        .execute(SELECT_USERS, &[], Method::Run)
        .await
        .unwrap();
    assert_eq!(empty.rows, Rows::Single(None));

    for name in ["Alice", "Bob"] {
        proxy
            .execute(INSERT_USER, &[Value::from(name)], Method::Run)
            .await
            .unwrap();
    }

    let first = proxy
        .execute(&format!("{SELECT_USERS} order by \"id\""), &[], Method::Get)
        .await
        .unwrap();
    assert_eq!(
        first.rows,
        Rows::Single(Some(vec![Value::Int(1), Value::from("Alice")]))
    );
}

#[tokio::test]
async fn test_malformed_sql_degrades_to_empty() {
    let (proxy, _dir) = users_proxy().await;

    let read = proxy
        .execute("SELECT * FROM no_such_table", &[], Method::All)
        .await
        .unwrap();
    assert_eq!(read.rows, Rows::Many(vec![]));

    // NOT NULL violation on the write path is absorbed as well
    let write = proxy
        .execute(INSERT_USER, &[Value::Null], Method::Run)
        .await
        .unwrap();
    assert_eq!(write.rows, Rows::Many(vec![]));

    let all = proxy.execute(SELECT_USERS, &[], Method::All).await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn test_propagate_policy_reports_engine_errors() {
    let (proxy, _dir) = users_proxy().await;
    let proxy = proxy.with_policy(StatementErrorPolicy::Propagate);

    let err = proxy
        .execute("SELECT * FROM no_such_table", &[], Method::All)
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::Statement(_)));
    assert!(err.to_string().contains("no_such_table"));

    let err = proxy
        .execute(INSERT_USER, &[Value::Null], Method::Run)
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::Statement(_)));
}

#[tokio::test]
async fn test_returning_clause_is_classified_as_write() {
    let (proxy, _dir) = users_proxy().await;

    let result = proxy
        .execute(
            "INSERT INTO users (name) VALUES (?) RETURNING id",
            &[Value::from("Alice")],
            Method::All,
        )
        .await
        .unwrap();
    assert_eq!(result.rows, Rows::Many(vec![]));

    let all = proxy.execute(SELECT_USERS, &[], Method::All).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_missing_database_is_storage_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let engine = SqliteEngine::with_options(SqliteEngineOptions {
        create_if_missing: false,
        ..Default::default()
    });
    let proxy = ProxyExecutor::new(
        engine,
        Locator::new("absent.db").with_resource_dir(dir.path()),
    );

    let err = proxy
        .execute("SELECT 1", &[], Method::All)
        .await
        .unwrap_err();
    assert!(err.is_storage_unavailable());
}

#[tokio::test]
async fn test_state_is_visible_to_a_new_engine() {
    let (proxy, dir) = users_proxy().await;
    proxy
        .execute(INSERT_USER, &[Value::from("Alice")], Method::Run)
        .await
        .unwrap();
    proxy.engine().close().await;

    let reopened = ProxyExecutor::new(
        SqliteEngine::new(),
        Locator::new("test.db").with_resource_dir(dir.path()),
    );
    let result = reopened
        .execute_statement(&Statement::new(SELECT_USERS, vec![], Method::All))
        .await
        .unwrap();
    assert_eq!(result.len(), 1);
}

#[tokio::test]
async fn test_raw_query_returns_keyed_rows() {
    let (proxy, _dir) = users_proxy().await;
    proxy
        .execute(INSERT_USER, &[Value::from("Alice")], Method::Run)
        .await
        .unwrap();

    let rows = proxy
        .raw_query("select * from users where name = ?", &[Value::from("Alice")])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::from("Alice")));
    assert_eq!(
        serde_json::to_string(&rows).unwrap(),
        r#"[{"id":1,"name":"Alice"}]"#
    );
}

#[tokio::test]
async fn test_deleted_database_is_unavailable_on_next_call() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");
    let locator = Locator::new("app.db").with_resource_dir(dir.path());

    let seeding = ProxyExecutor::new(SqliteEngine::new(), locator.clone());
    seeding.execute(CREATE_USERS, &[], Method::Run).await.unwrap();
    seeding
        .execute(INSERT_USER, &[Value::from("Alice")], Method::Run)
        .await
        .unwrap();
    seeding.engine().close().await;

    let proxy = ProxyExecutor::new(
        SqliteEngine::with_options(SqliteEngineOptions {
            create_if_missing: false,
            ..Default::default()
        }),
        locator,
    );
    let before = proxy.execute(SELECT_USERS, &[], Method::All).await.unwrap();
    assert_eq!(before.len(), 1);

    std::fs::remove_file(&path).unwrap();

    let err = proxy
        .execute(SELECT_USERS, &[], Method::All)
        .await
        .unwrap_err();
    assert!(err.is_storage_unavailable());

    let err = proxy
        .execute(INSERT_USER, &[Value::from("Bob")], Method::Run)
        .await
        .unwrap_err();
    assert!(err.is_storage_unavailable());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_read_only_locator_keeps_its_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ro.db");

    // Seed in the default rollback journal so a read-only open needs no -shm file
    let seed = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true),
    )
    .await
    .unwrap();
    sqlx::query(CREATE_USERS).execute(&seed).await.unwrap();
    sqlx::query("insert into users (name) values ('Alice')")
        .execute(&seed)
        .await
        .unwrap();
    seed.close().await;

    let proxy = ProxyExecutor::new(
        SqliteEngine::new(),
        Locator::new(format!("sqlite:{}?mode=ro", path.display())),
    )
    .with_policy(StatementErrorPolicy::Propagate);

    let rows = proxy.execute(SELECT_USERS, &[], Method::All).await.unwrap();
    assert_eq!(rows.len(), 1);

    let err = proxy
        .execute("create table t (v integer)", &[], Method::Run)
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::Statement(_)));

    let missing = dir.path().join("absent.db");
    let proxy = ProxyExecutor::new(
        SqliteEngine::new(),
        Locator::new(format!("sqlite:{}?mode=ro", missing.display())),
    );
    let err = proxy
        .execute("create table t (v integer)", &[], Method::Run)
        .await
        .unwrap_err();
    assert!(err.is_storage_unavailable());
    assert!(!missing.exists());
}
