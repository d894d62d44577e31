//! End-to-end checks against a live PostgreSQL.
//! Run with: DEMO_SERVER_DB_HOST=... cargo test -- --ignored

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use api_demo_server::config::Config;
use api_demo_server::db::{self, DataBase, Identifier, Provisioned};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Per-test database name so parallel tests never share state.
fn unique_name(prefix: &str) -> Identifier {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .subsec_nanos();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    Identifier::new(format!("{prefix}_{}_{nanos}_{n}", std::process::id()))
        .expect("generated name should be valid")
}

fn manager_for(database: &Identifier) -> DataBase {
    let cfg = Config::load().expect("config should load from env");
    DataBase::new(cfg.connect_target(), database.clone())
}

fn names_table() -> Identifier {
    Identifier::new("names").expect("valid table name")
}

#[tokio::test]
#[ignore = "requires database"]
async fn ensure_database_creates_exactly_once() {
    let name = unique_name("demo_idem");
    let mut db = manager_for(&name);

    assert_eq!(db.ensure_database(&name).await.unwrap(), Provisioned::Created);
    assert_eq!(
        db.ensure_database(&name).await.unwrap(),
        Provisioned::AlreadyExists
    );
    assert!(db.database_exists(&name).await.unwrap());

    assert!(db.drop_database(&name).await.unwrap());
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn ensure_table_creates_exactly_once_and_provisions_database() {
    let name = unique_name("demo_table");
    let table = names_table();
    let mut db = manager_for(&name);

    // The target database does not exist yet; the table call provisions it.
    assert_eq!(db.ensure_table(&table).await.unwrap(), Provisioned::Created);
    assert_eq!(
        db.ensure_table(&table).await.unwrap(),
        Provisioned::AlreadyExists
    );
    assert!(db.database_exists(&name).await.unwrap());

    assert!(db.drop_database(&name).await.unwrap());
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn inserted_row_is_listed() {
    let name = unique_name("demo_insert");
    let table = names_table();
    let mut db = manager_for(&name);

    let id = db.insert_row(&table, "alice").await.unwrap();
    let rows = db.list_rows(&table).await.unwrap();
    assert!(rows.iter().any(|r| r.id == id && r.data == "alice"));

    assert!(db.drop_database(&name).await.unwrap());
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn drop_then_ensure_recreates_empty_database() {
    let name = unique_name("demo_recreate");
    let table = names_table();
    let mut db = manager_for(&name);

    db.insert_row(&table, "carol").await.unwrap();
    assert!(db.drop_database(&name).await.unwrap());
    assert!(!db.database_exists(&name).await.unwrap());

    assert_eq!(db.ensure_database(&name).await.unwrap(), Provisioned::Created);
    assert!(db.list_rows(&table).await.unwrap().is_empty());

    assert!(db.drop_database(&name).await.unwrap());
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn dropping_a_missing_database_reports_success() {
    let name = unique_name("demo_missing");
    let mut db = manager_for(&name);
    assert!(db.drop_database(&name).await.unwrap());
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn metacharacters_in_names_are_never_executed() {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .subsec_nanos();
    let hostile = Identifier::new(format!("x{nanos}\"; DROP TABLE names;--")).unwrap();
    let mut db = manager_for(&hostile);

    assert_eq!(
        db.ensure_database(&hostile).await.unwrap(),
        Provisioned::Created
    );
    // The whole string became one database name.
    assert!(db.database_exists(&hostile).await.unwrap());

    let table = Identifier::new("t\"; DELETE FROM pg_database;--").unwrap();
    db.insert_row(&table, "'); DROP TABLE names;--").await.unwrap();
    let rows = db.list_rows(&table).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].data, "'); DROP TABLE names;--");

    assert!(db.drop_database(&hostile).await.unwrap());
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn create_table_insert_and_list_scenario() {
    let name = unique_name("names_db");
    let table = names_table();
    let mut db = manager_for(&name);

    db.ensure_database(&name).await.unwrap();
    db.ensure_table(&table).await.unwrap();
    db.insert_row(&table, "bob").await.unwrap();

    let rows = db.list_rows(&table).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].data, "bob");

    assert!(db.drop_database(&name).await.unwrap());
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn concurrent_callers_are_serialized_through_the_actor() {
    let name = unique_name("demo_actor");
    let table = names_table();
    let handle = db::spawn(manager_for(&name)).await.unwrap();

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let handle = handle.clone();
            let table = table.clone();
            tokio::spawn(async move { handle.insert_row(&table, format!("user{i}")).await })
        })
        .collect();
    for task in tasks {
        task.await.expect("task panicked").expect("insert failed");
    }

    let rows = handle.list_rows(&table).await.unwrap();
    assert_eq!(rows.len(), 10);

    assert!(handle.drop_database(&name).await.unwrap());
    handle.shutdown().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn drop_table_removes_rows() {
    let name = unique_name("demo_droptable");
    let table = names_table();
    let mut db = manager_for(&name);

    db.insert_row(&table, "dave").await.unwrap();
    db.drop_table(&table).await.unwrap();
    assert_eq!(db.ensure_table(&table).await.unwrap(), Provisioned::Created);
    assert!(db.list_rows(&table).await.unwrap().is_empty());

    assert!(!db.server_version().await.unwrap().is_empty());
    assert!(db.drop_database(&name).await.unwrap());
    db.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn terminated_backend_is_replaced_on_next_call() {
    let name = unique_name("demo_terminated");
    let table = names_table();
    let mut db = manager_for(&name);

    db.insert_row(&table, "erin").await.unwrap();
    assert!(db.is_connected());

    let cfg = Config::load().expect("config should load from env");
    let options = PgConnectOptions::new()
        .host(&cfg.db_host)
        .port(cfg.db_port)
        .username(&cfg.db_user)
        .password(&cfg.db_password)
        .database("postgres");
    let mut admin = PgConnection::connect_with(&options).await.unwrap();
    let terminated: Vec<bool> = sqlx::query_scalar(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
         WHERE datname = $1 AND pid <> pg_backend_pid()",
    )
    .bind(name.as_str())
    .fetch_all(&mut admin)
    .await
    .unwrap();
    assert!(!terminated.is_empty());
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    assert!(db.list_rows(&table).await.is_err());
    assert!(!db.is_connected());

    let rows = db.list_rows(&table).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].data, "erin");

    assert!(db.drop_database(&name).await.unwrap());
    db.close().await;
    admin.close().await.unwrap();
}
