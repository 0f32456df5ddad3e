//! 查询语句
//!
//! 提供 Select、Insert、Update、Delete 四种语句，由 [`clause`](crate::clause) 中的子句组合而成。
//! 所有语句都使用 `?` 作为占位符，`params()` 返回的绑定值与占位符顺序一致。

pub mod delete;
pub mod insert;
pub mod select;
pub mod update;

pub use delete::Delete;
pub use insert::Insert;
pub use select::{Column, Direction, Expression, Join, JoinType, Select};
pub use update::Update;

use std::sync::Arc;

use crate::dialect::{Ansi, Dialect};
use crate::value::Value;

/// 渲染完成、可交给连接执行的语句
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

pub(crate) fn default_dialect() -> Arc<dyn Dialect> {
    Arc::new(Ansi)
}
