//! INSERT 语句

use std::sync::Arc;

use super::{default_dialect, Statement};
use crate::clause::{TableName, Values};
use crate::dialect::Dialect;
use crate::error::{ActiveSqlError, Result};
use crate::value::{Value, ValueMap};

/// `INSERT INTO <table> (<cols>) VALUES (<?, ...>)`
#[derive(Debug, Clone)]
pub struct Insert {
    dialect: Arc<dyn Dialect>,
    table: Option<String>,
    values: ValueMap,
    returning: Option<String>,
}

impl Default for Insert {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            table: None,
            values: ValueMap::new(),
            returning: None,
        }
    }
}

impl Insert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(&mut self, dialect: Arc<dyn Dialect>) -> &mut Self {
        self.dialect = dialect;
        self
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// 追加 `RETURNING <column>`，仅在方言支持时输出（PostgreSQL）
    pub fn returning(&mut self, column: &str) -> &mut Self {
        self.returning = Some(column.to_string());
        self
    }

    /// 生成 SQL；没有表名或没有值时返回空字符串
    pub fn sql(&self) -> String {
        let table = match &self.table {
            Some(t) if !self.values.is_empty() => t,
            _ => return String::new(),
        };

        let columns = self
            .values
            .keys()
            .map(|field| self.dialect.quote_field(field))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; self.values.len()].join(", ");

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.dialect.quote_table(table),
            columns,
            placeholders
        );
        if let Some(column) = &self.returning {
            if self.dialect.supports_returning() {
                sql.push_str(" RETURNING ");
                sql.push_str(&self.dialect.quote_field(column));
            }
        }
        sql
    }

    pub fn params(&self) -> Vec<Value> {
        self.values.values().cloned().collect()
    }

    pub fn statement(&self) -> Result<Statement> {
        if self.table.is_none() {
            return Err(ActiveSqlError::MissingTable);
        }
        if self.values.is_empty() {
            return Err(ActiveSqlError::MissingValues);
        }
        Ok(Statement::new(self.sql(), self.params()))
    }

    pub fn reset(&mut self) -> &mut Self {
        self.table = None;
        self.values.clear();
        self.returning = None;
        self
    }
}

impl TableName for Insert {
    fn table_slot(&self) -> &Option<String> {
        &self.table
    }

    fn table_slot_mut(&mut self) -> &mut Option<String> {
        &mut self.table
    }
}

impl Values for Insert {
    fn value_map(&self) -> &ValueMap {
        &self.values
    }

    fn value_map_mut(&mut self) -> &mut ValueMap {
        &mut self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySql, Postgres};

    #[test]
    fn test_table() {
        let mut q = Insert::new();
        assert_eq!(q.table_name(), None);
        q.table("users");
        assert_eq!(q.table_name(), Some("users"));
    }

    #[test]
    fn test_basic_insert() {
        let mut q = Insert::new();
        q.table("users")
            .value("name", "Alex")
            .value("email", "alex@example.com");
        assert_eq!(
            q.sql(),
            "INSERT INTO \"users\" (\"name\", \"email\") VALUES (?, ?)"
        );
        assert_eq!(
            q.params(),
            vec![Value::from("Alex"), Value::from("alex@example.com")]
        );
    }

    #[test]
    fn test_insert_mysql() {
        let mut q = Insert::new();
        q.with_dialect(Arc::new(MySql))
            .table("users")
            .values([("name", "Alex")]);
        assert_eq!(q.sql(), "INSERT INTO `users` (`name`) VALUES (?)");
    }

    #[test]
    fn test_insert_without_values_is_empty() {
        let mut q = Insert::new();
        q.table("users");
        assert_eq!(q.sql(), "");
        assert!(matches!(q.statement(), Err(ActiveSqlError::MissingValues)));
    }

    #[test]
    fn test_insert_without_table_is_empty() {
        let mut q = Insert::new();
        q.value("name", "Alex");
        assert_eq!(q.sql(), "");
        assert!(matches!(q.statement(), Err(ActiveSqlError::MissingTable)));
    }

    #[test]
    fn test_returning_only_when_supported() {
        let mut q = Insert::new();
        q.table("users").value("name", "Alex").returning("id");
        assert_eq!(q.sql(), "INSERT INTO \"users\" (\"name\") VALUES (?)");

        q.with_dialect(Arc::new(Postgres));
        assert_eq!(
            q.sql(),
            "INSERT INTO \"users\" (\"name\") VALUES (?) RETURNING \"id\""
        );
    }

    #[test]
    fn test_reset_insert() {
        let mut q = Insert::new();
        q.table("users").value("name", "Alex");
        q.reset();
        assert_eq!(q.sql(), "");
        assert_eq!(q.table_name(), None);
        assert!(q.params().is_empty());
        // 幂等
        q.reset();
        assert_eq!(q.sql(), "");
    }
}
