//! 通过 SqlxConnection 在内存 SQLite 上端到端执行
#![cfg(feature = "sqlite")]

use std::sync::Arc;

use activesql::prelude::*;
use activesql::{DbConfig, SqlxConnection};

fn connect() -> Arc<SqlxConnection> {
    let conn = SqlxConnection::from_config(&DbConfig::new("sqlite::memory:")).unwrap();
    conn.execute(
        "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, \
         email TEXT, age INTEGER, score REAL, avatar BLOB)",
        &[],
    )
    .unwrap();
    Arc::new(conn)
}

fn users(conn: Arc<SqlxConnection>) -> Arc<ModelType> {
    ModelType::builder("User", "users")
        .field("name", Field::new().rule(Rule::Required))
        .connection(conn)
        .build()
}

#[test]
fn test_create_find_update_delete() {
    let conn = connect();
    let ty = users(conn.clone());

    let mut alex = ty.factory();
    alex.set("name", "Alex").set("email", "alex@example.com").set("age", 30);
    alex.save().unwrap();
    let id = alex.original("id");
    assert_eq!(id, Value::Int64(1));

    let found = ty.find_by_id(id.clone()).unwrap();
    assert!(found.is_loaded());
    assert_eq!(found.get("name"), Value::from("Alex"));
    assert_eq!(found.get("age"), Value::Int64(30));
    assert_eq!(found.get("score"), Value::Null);

    let mut found = found;
    found.set("name", "Jake");
    found.save().unwrap();
    assert_eq!(ty.find_by_id(id.clone()).unwrap().get("name"), Value::from("Jake"));

    found.delete().unwrap();
    assert!(!ty.find_by_id(id).unwrap().is_loaded());
}

#[test]
fn test_text_primary_key_round_trip() {
    let conn = connect();
    conn.execute("CREATE TABLE tags (id TEXT PRIMARY KEY, label TEXT)", &[]).unwrap();
    let ty = ModelType::builder("Tag", "tags")
        .connection(conn.clone())
        .build();

    let mut tag = ty.factory();
    tag.set("id", "rust").set("label", "Rust");
    tag.save().unwrap();
    assert_eq!(tag.original("id"), Value::from("rust"));

    tag.set("label", "Rust lang");
    tag.save().unwrap();
    assert_eq!(
        ty.find_by_id("rust").unwrap().get("label"),
        Value::from("Rust lang")
    );

    tag.delete().unwrap();
    assert!(!ty.find_by_id("rust").unwrap().is_loaded());
    let row = conn
        .fetch("SELECT COUNT(*) AS n FROM tags", &[])
        .unwrap()
        .unwrap();
    assert_eq!(row.get("n"), Some(&Value::Int64(0)));
}

#[test]
fn test_query_resultset_and_count() {
    let conn = connect();
    let ty = users(conn.clone());

    for (name, age) in [("Alex", 30), ("Lucie", 25), ("Jake", 17)] {
        let mut user = ty.factory();
        user.set("name", name).set("age", age);
        user.save().unwrap();
    }

    let mut q = ty.query();
    q.and_where("age", ">=", 18).order_by("age", Direction::Asc);
    let adults = ty.fetch_all(&q).unwrap();
    let names: Vec<Value> = adults.iter().map(|m| m.get("name")).collect();
    assert_eq!(names, vec![Value::from("Lucie"), Value::from("Alex")]);

    assert_eq!(ty.fetch_count(&q).unwrap(), 2);
    assert_eq!(ty.fetch_count(&ty.query()).unwrap(), 3);

    let mut q = ty.query();
    q.and_where("name", "=", "Nobody")
        .or_where_group(|g| {
            g.and_with("age", "<", 18).and_with("name", "=", "Jake");
        });
    let rs = ty.fetch_all(&q).unwrap();
    assert_eq!(rs.len(), 1);
    assert_eq!(rs.first().map(|m| m.get("name")), Some(Value::from("Jake")));
}

#[test]
fn test_value_types_round_trip() {
    let conn = connect();
    conn.execute(
        "INSERT INTO users (name, score, avatar) VALUES (?, ?, ?)",
        &[Value::from("Bytes"), Value::from(1.5f64), Value::from(vec![1u8, 2, 3])],
    )
    .unwrap();

    let row = conn
        .fetch("SELECT name, score, avatar, email FROM users", &[])
        .unwrap()
        .unwrap();
    assert_eq!(row.get("name"), Some(&Value::from("Bytes")));
    assert_eq!(row.get("score"), Some(&Value::Float64(1.5)));
    assert_eq!(row.get("avatar"), Some(&Value::Bytes(vec![1, 2, 3])));
    assert_eq!(row.get("email"), Some(&Value::Null));
}

#[test]
fn test_database_error_is_propagated() {
    let conn = connect();
    let err = conn.execute("INSERT INTO missing (a) VALUES (?)", &[Value::from(1)]);
    assert!(matches!(err, Err(activesql::ActiveSqlError::DatabaseError(_))));

    // NOT NULL 约束失败时模型状态不变
    let ty = users(conn);
    let mut user = ty.factory();
    user.set("email", "nobody@example.com");
    assert!(user.save().is_err());
    assert!(user.has_changes());
    assert!(!user.is_loaded());
}
