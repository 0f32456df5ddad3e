//! DELETE 语句

use std::sync::Arc;

use super::{default_dialect, Statement};
use crate::clause::{join_parts, Paginate, Pagination, TableName, Where};
use crate::condition::ConditionBuilder;
use crate::dialect::Dialect;
use crate::error::{ActiveSqlError, Result};
use crate::value::Value;

/// `DELETE FROM <table> [WHERE ...] [LIMIT n]`
#[derive(Debug, Clone)]
pub struct Delete {
    dialect: Arc<dyn Dialect>,
    table: Option<String>,
    wheres: ConditionBuilder,
    pagination: Pagination,
}

impl Default for Delete {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            table: None,
            wheres: ConditionBuilder::new(),
            pagination: Pagination::default(),
        }
    }
}

impl Delete {
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

    pub fn sql(&self) -> String {
        let table = match &self.table {
            Some(t) => t,
            None => return String::new(),
        };
        let d = self.dialect.as_ref();
        let head = format!("DELETE FROM {}", d.quote_table(table));
        join_parts([
            head.as_str(),
            self.build_where_sql(d).as_str(),
            self.build_paginate_sql().as_str(),
        ])
    }

    pub fn params(&self) -> Vec<Value> {
        self.wheres.parameters().to_vec()
    }

    pub fn statement(&self) -> Result<Statement> {
        if self.table.is_none() {
            return Err(ActiveSqlError::MissingTable);
        }
        Ok(Statement::new(self.sql(), self.params()))
    }

    pub fn reset(&mut self) -> &mut Self {
        self.table = None;
        self.wheres.clear();
        self.pagination = Pagination::default();
        self
    }
}

impl TableName for Delete {
    fn table_slot(&self) -> &Option<String> {
        &self.table
    }

    fn table_slot_mut(&mut self) -> &mut Option<String> {
        &mut self.table
    }
}

impl Where for Delete {
    fn where_builder(&self) -> &ConditionBuilder {
        &self.wheres
    }

    fn where_builder_mut(&mut self) -> &mut ConditionBuilder {
        &mut self.wheres
    }
}

impl Paginate for Delete {
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

    #[test]
    fn test_delete() {
        let mut q = Delete::new();
        q.table("users").and_where("id", "=", 27).limit(1);
        assert_eq!(q.sql(), "DELETE FROM \"users\" WHERE \"id\" = ? LIMIT 1");
        assert_eq!(q.params(), vec![Value::from(27)]);
    }

    #[test]
    fn test_delete_all_rows() {
        let mut q = Delete::new();
        q.table("sessions");
        assert_eq!(q.sql(), "DELETE FROM \"sessions\"");
        assert!(q.params().is_empty());
    }

    #[test]
    fn test_delete_without_table() {
        let q = Delete::new();
        assert_eq!(q.sql(), "");
        assert!(matches!(q.statement(), Err(ActiveSqlError::MissingTable)));
    }

    #[test]
    fn test_reset_delete() {
        let mut q = Delete::new();
        q.table("users").and_where("id", "=", 27).limit(1);
        q.reset();
        assert_eq!(q.sql(), "");
        assert!(q.params().is_empty());
    }
}
