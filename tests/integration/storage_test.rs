//! Storage engine integration tests.
//!
//! Exercises the SQLite engine directly through the driver traits.

use sqlite_proxy::storage::{Locator, SqliteEngine, StorageEngine, Value};

#[tokio::test]
async fn test_handles_for_one_locator_see_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let locator = Locator::new("test.db").with_resource_dir(dir.path());
    let engine = SqliteEngine::new();

    let writer = engine.acquire(&locator).await.unwrap();
    writer
        .execute("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT)", &[])
        .await
        .unwrap();
    writer
        .execute(
            "INSERT INTO items (label) VALUES (?)",
            &[Value::from("first")],
        )
        .await
        .unwrap();
    drop(writer);

    let reader = engine.acquire(&locator).await.unwrap();
    let rows = reader
        .select("SELECT id, label FROM items", &[])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("label"), Some(&Value::from("first")));

    engine.close().await;
}

#[tokio::test]
async fn test_sqlite_url_locator() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("url.db");
    let locator = Locator::new(format!("sqlite:{}", path.display()));
    let engine = SqliteEngine::new();

    let handle = engine.acquire(&locator).await.unwrap();
    let outcome = handle
        .execute("CREATE TABLE t (v INTEGER)", &[])
        .await
        .unwrap();
    assert_eq!(outcome.rows_affected, 0);
    assert!(path.exists());

    engine.close().await;
}

#[tokio::test]
async fn test_empty_locator_is_unavailable() {
    let engine = SqliteEngine::new();
    let result = engine.acquire(&Locator::new("")).await;
    assert!(matches!(result, Err(e) if e.is_storage_unavailable()));
}

#[tokio::test]
async fn test_update_reports_rows_affected() {
    let engine = SqliteEngine::new();
    let handle = engine.acquire(&Locator::new(":memory:")).await.unwrap();

    handle
        .execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", &[])
        .await
        .unwrap();
    handle
        .execute(
            "INSERT INTO users (name) VALUES ('a'), ('b'), ('c')",
            &[],
        )
        .await
        .unwrap();

    let outcome = handle
        .execute("UPDATE users SET name = ? WHERE id > ?", &[Value::from("z"), Value::Int(1)])
        .await
        .unwrap();
    assert_eq!(outcome.rows_affected, 2);
}
