//! 连接接口
//!
//! 模型层只依赖 [`Connection`]：传入带 `?` 占位符的 SQL 和绑定值，返回影响行数或结果行。
//! 基于 sqlx 的实现见 [`SqlxConnection`](crate::db_pool::SqlxConnection)。

use std::sync::Arc;

use indexmap::IndexMap;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::value::Value;

/// 一行结果，列名到值，保持查询列顺序
pub type Row = IndexMap<String, Value>;

/// 执行 INSERT / UPDATE / DELETE 的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// 自增主键；驱动无法提供时为 None
    pub last_insert_id: Option<Value>,
}

impl ExecResult {
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    pub fn with_last_insert_id(mut self, id: impl Into<Value>) -> Self {
        self.last_insert_id = Some(id.into());
        self
    }
}

/// 同步连接
///
/// 调用会阻塞直到数据库返回。实现需要能在多个模型类型之间共享。
pub trait Connection: Send + Sync {
    /// 渲染 SQL 时使用的方言
    fn dialect(&self) -> Arc<dyn Dialect>;

    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult>;

    fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// 返回第一行
    fn fetch(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.fetch_all(sql, params)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Sqlite;

    struct Fixed(Vec<Row>);

    impl Connection for Fixed {
        fn dialect(&self) -> Arc<dyn Dialect> {
            Arc::new(Sqlite)
        }

        fn execute(&self, _sql: &str, _params: &[Value]) -> Result<ExecResult> {
            Ok(ExecResult::new(0))
        }

        fn fetch_all(&self, _sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_fetch_returns_first_row() {
        let mut first = Row::new();
        first.insert("id".to_string(), Value::from(1));
        let mut second = Row::new();
        second.insert("id".to_string(), Value::from(2));

        let conn = Fixed(vec![first.clone(), second]);
        assert_eq!(conn.fetch("SELECT 1", &[]).unwrap(), Some(first));
        assert_eq!(Fixed(vec![]).fetch("SELECT 1", &[]).unwrap(), None);
    }

    #[test]
    fn test_exec_result() {
        let r = ExecResult::new(1).with_last_insert_id(42i64);
        assert_eq!(r.rows_affected, 1);
        assert_eq!(r.last_insert_id, Some(Value::Int64(42)));
    }
}
