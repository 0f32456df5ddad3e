use std::sync::Arc;

use activesql::prelude::*;
use activesql::{ActiveSqlError, DbConfig, SqlxConnection};

struct User;

impl Schema for User {
    const TABLE: &'static str = "users";

    fn fields() -> Vec<(&'static str, Field)> {
        vec![
            (
                "username",
                Field::new()
                    .on_set(|_, _, v| match v {
                        Value::String(s) => Value::from(s.trim().to_lowercase()),
                        other => other,
                    })
                    .rule(Rule::Required)
                    .rule(Rule::LengthMin(3)),
            ),
            ("email", Field::new().rule(Rule::Required).rule(Rule::Email)),
        ]
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = DbConfig::from_env().unwrap_or_else(|_| DbConfig::new("sqlite::memory:"));
    println!("Connecting to {} ...", config.url);
    let conn = Arc::new(SqlxConnection::from_config(&config)?);
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (\
         id INTEGER PRIMARY KEY AUTOINCREMENT, \
         username TEXT NOT NULL, \
         email TEXT NOT NULL, \
         active INTEGER NOT NULL DEFAULT 1)",
        &[],
    )?;
    println!("Connected successfully!\n");

    let users = ModelType::of::<User>().connection(conn.clone()).build();

    // ========== 1. 新建 ==========
    println!("=== 1. CREATE ===");
    let mut ids = Vec::new();
    for (name, email) in [
        ("  Alex ", "alex@example.com"),
        ("Lucie", "lucie@example.com"),
        ("Jake", "jake@example.com"),
    ] {
        let mut user = users.factory();
        user.set("username", name).set("email", email);
        user.validate(&RuleSet::new())?;
        user.save()?;
        println!("inserted {} with id {}", user.get("username"), user.get("id"));
        ids.push(user.get("id"));
    }
    println!();

    // ========== 2. 校验 ==========
    println!("=== 2. VALIDATE ===");
    let mut invalid = users.factory();
    invalid.set("username", "x").set("email", "not-an-email");
    match invalid.validate(&RuleSet::new()) {
        Err(ActiveSqlError::Validation(e)) => {
            for (field, messages) in &e.messages {
                println!("{}: {}", field, messages.join("; "));
            }
        }
        other => println!("unexpected: {:?}", other),
    }
    println!();

    // ========== 3. 按主键查找并更新 ==========
    println!("=== 3. FIND_BY_ID + UPDATE ===");
    let mut alex = users.find_by_id(ids[0].clone())?;
    println!("found: {} <{}>", alex.get("username"), alex.get("email"));
    alex.set("email", "alex@example.org");
    alex.save()?;
    println!(
        "email changed from {} to {}\n",
        alex.original("email"),
        users.find_by_id(ids[0].clone())?.get("email")
    );

    // ========== 4. 条件查询 ==========
    println!("=== 4. QUERY ===");
    let mut q = users.query();
    q.and_where("active", "=", true)
        .and_where_group(|g| {
            g.and_with("username", "=", "lucie")
                .or_with("username", "=", "jake");
        })
        .order_by("username", Direction::Desc);
    println!("sql: {}", q.sql());
    for user in &users.fetch_all(&q)? {
        println!("  - {} ({})", user.get("username"), user.get("id"));
    }
    println!("count: {}\n", users.fetch_count(&q)?);

    // ========== 5. 删除 ==========
    println!("=== 5. DELETE ===");
    let mut jake = users.find_by_id(ids[2].clone())?;
    jake.delete()?;
    println!("remaining users: {}", users.fetch_count(&users.query())?);

    Ok(())
}
