//! activesql：条件构建器、SQL 语句与 Active Record 模型
//!
//! ```rust,ignore
//! use activesql::prelude::*;
//!
//! let mut q = Select::new();
//! q.from("users", None)
//!     .and_where("age", ">", 18)
//!     .or_where_group(|g| {
//!         g.and_with("city", "=", "London").and_with("active", "=", true);
//!     });
//! // SELECT * FROM "users" WHERE "age" > ? OR ("city" = ? AND "active" = ?)
//! ```

pub mod clause;
pub mod condition;
pub mod config;
pub mod connection;
pub mod db_pool;
pub mod dialect;
pub mod error;
pub mod field;
pub mod model;
pub mod query;
pub mod resultset;
pub mod traits;
pub mod validation;
pub mod value;

pub use condition::{Condition, ConditionBuilder, ConditionType};
pub use config::DbConfig;
pub use connection::{Connection, ExecResult, Row};
pub use db_pool::{DbDriver, DbPool, SqlxConnection};
pub use dialect::{Ansi, Dialect, MySql, Postgres, Sqlite};
pub use error::{ActiveSqlError, Result};
pub use field::Field;
pub use model::{Fetched, Model, ModelType};
pub use query::{Delete, Direction, Expression, Insert, JoinType, Select, Statement, Update};
pub use resultset::Resultset;
pub use traits::Schema;
pub use validation::{Rule, RuleSet, ValidationError};
pub use value::{Value, ValueMap};

/// 常用类型与子句 trait
pub mod prelude {
    pub use crate::clause::{Having, Paginate, TableName, Values, Where};
    pub use crate::{
        Connection, Delete, Direction, Expression, Field, Insert, Model, ModelType, Rule,
        RuleSet, Schema, Select, Update, Value,
    };
}
