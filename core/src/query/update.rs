//! UPDATE 语句

use std::sync::Arc;

use super::{default_dialect, Statement};
use crate::clause::{join_parts, Paginate, Pagination, TableName, Values, Where};
use crate::condition::ConditionBuilder;
use crate::dialect::Dialect;
use crate::error::{ActiveSqlError, Result};
use crate::value::{Value, ValueMap};

/// `UPDATE <table> SET <col> = ?, ... [WHERE ...] [LIMIT n]`
#[derive(Debug, Clone)]
pub struct Update {
    dialect: Arc<dyn Dialect>,
    table: Option<String>,
    values: ValueMap,
    wheres: ConditionBuilder,
    pagination: Pagination,
}

impl Default for Update {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            table: None,
            values: ValueMap::new(),
            wheres: ConditionBuilder::new(),
            pagination: Pagination::default(),
        }
    }
}

impl Update {
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

    /// 生成 SQL；没有表名或没有值时返回空字符串
    pub fn sql(&self) -> String {
        let table = match &self.table {
            Some(t) if !self.values.is_empty() => t,
            _ => return String::new(),
        };
        let d = self.dialect.as_ref();

        let assignments = self
            .values
            .keys()
            .map(|field| format!("{} = ?", d.quote_field(field)))
            .collect::<Vec<_>>()
            .join(", ");
        let head = format!("UPDATE {} SET {}", d.quote_table(table), assignments);

        join_parts([
            head.as_str(),
            self.build_where_sql(d).as_str(),
            self.build_paginate_sql().as_str(),
        ])
    }

    /// SET 的值在前，WHERE 的值在后
    pub fn params(&self) -> Vec<Value> {
        let mut params: Vec<Value> = self.values.values().cloned().collect();
        params.extend_from_slice(self.wheres.parameters());
        params
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
        self.wheres.clear();
        self.pagination = Pagination::default();
        self
    }
}

impl TableName for Update {
    fn table_slot(&self) -> &Option<String> {
        &self.table
    }

    fn table_slot_mut(&mut self) -> &mut Option<String> {
        &mut self.table
    }
}

impl Values for Update {
    fn value_map(&self) -> &ValueMap {
        &self.values
    }

    fn value_map_mut(&mut self) -> &mut ValueMap {
        &mut self.values
    }
}

impl Where for Update {
    fn where_builder(&self) -> &ConditionBuilder {
        &self.wheres
    }

    fn where_builder_mut(&mut self) -> &mut ConditionBuilder {
        &mut self.wheres
    }
}

impl Paginate for Update {
    fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    fn pagination_mut(&mut self) -> &mut Pagination {
        &mut self.pagination
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::MySql;

    #[test]
    fn test_update_with_where_and_limit() {
        let mut q = Update::new();
        q.table("users")
            .value("name", "Alex")
            .value("email", "alex@example.com")
            .and_where("id", "=", 27)
            .limit(1);
        assert_eq!(
            q.sql(),
            "UPDATE \"users\" SET \"name\" = ?, \"email\" = ? WHERE \"id\" = ? LIMIT 1"
        );
        assert_eq!(
            q.params(),
            vec![
                Value::from("Alex"),
                Value::from("alex@example.com"),
                Value::from(27)
            ]
        );
    }

    #[test]
    fn test_update_without_where() {
        let mut q = Update::new();
        q.with_dialect(Arc::new(MySql))
            .table("users")
            .value("active", false);
        assert_eq!(q.sql(), "UPDATE `users` SET `active` = ?");
        assert_eq!(q.params(), vec![Value::Bool(false)]);
    }

    #[test]
    fn test_update_value_overwrites_keep_position() {
        let mut q = Update::new();
        q.table("users").value("a", 1).value("b", 2).value("a", 3);
        assert_eq!(q.sql(), "UPDATE \"users\" SET \"a\" = ?, \"b\" = ?");
        assert_eq!(q.params(), vec![Value::from(3), Value::from(2)]);
    }

    #[test]
    fn test_update_missing_parts() {
        let mut q = Update::new();
        q.and_where("id", "=", 1);
        assert_eq!(q.sql(), "");
        assert!(matches!(q.statement(), Err(ActiveSqlError::MissingTable)));

        q.table("users");
        assert_eq!(q.sql(), "");
        assert!(matches!(q.statement(), Err(ActiveSqlError::MissingValues)));
    }

    #[test]
    fn test_reset_update() {
        let mut q = Update::new();
        q.table("users")
            .value("name", "Alex")
            .and_where("id", "=", 1)
            .limit(1);
        q.reset();
        assert_eq!(q.sql(), "");
        assert!(q.params().is_empty());
        assert_eq!(q.get_limit(), None);
    }
}
