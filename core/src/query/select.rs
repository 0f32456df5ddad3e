//! SELECT 语句

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;

use super::{default_dialect, Statement};
use crate::clause::{join_parts, Having, Paginate, Pagination, TableName, Where};
use crate::condition::ConditionBuilder;
use crate::dialect::Dialect;
use crate::error::{ActiveSqlError, Result};
use crate::value::Value;

/// 原样输出、不做转义的 SQL 片段，如 `COUNT(id)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression(String);

impl Expression {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ColumnSource {
    Field(String),
    Expr(Expression),
}

/// 查询列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    source: ColumnSource,
    alias: Option<String>,
}

impl Column {
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    fn render(&self, dialect: &dyn Dialect) -> String {
        let mut sql = match &self.source {
            ColumnSource::Field(name) => dialect.quote_field(name),
            ColumnSource::Expr(expr) => expr.to_string(),
        };
        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            sql.push_str(&dialect.quote_identifier(alias));
        }
        sql
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// JOIN 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

impl JoinType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
        }
    }
}

impl FromStr for JoinType {
    type Err = ActiveSqlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INNER" => Ok(JoinType::Inner),
            "LEFT" => Ok(JoinType::Left),
            "RIGHT" => Ok(JoinType::Right),
            _ => Err(ActiveSqlError::InvalidJoinType(s.to_string())),
        }
    }
}

/// JOIN 描述
///
/// `predicate` 是原样输出的连接条件，例如 `users.id = comments.user_id`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinType,
    pub left: String,
    pub right: String,
    pub right_alias: Option<String>,
    pub predicate: String,
}

impl Join {
    fn render(&self, dialect: &dyn Dialect) -> String {
        let mut sql = format!("{} JOIN {}", self.kind.as_sql(), dialect.quote_table(&self.right));
        if let Some(alias) = &self.right_alias {
            sql.push_str(" AS ");
            sql.push_str(&dialect.quote_identifier(alias));
        }
        sql.push_str(" ON ");
        sql.push_str(&self.predicate);
        sql
    }
}

/// `SELECT ... FROM ... JOIN ... WHERE ... GROUP BY ... HAVING ... ORDER BY ... LIMIT ...`
#[derive(Debug, Clone)]
pub struct Select {
    dialect: Arc<dyn Dialect>,
    columns: Vec<Column>,
    table: Option<String>,
    alias: Option<String>,
    joins: Vec<Join>,
    wheres: ConditionBuilder,
    group_by: Vec<String>,
    havings: ConditionBuilder,
    order_by: IndexMap<String, Direction>,
    pagination: Pagination,
    flags: IndexMap<String, String>,
}

impl Default for Select {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            columns: Vec::new(),
            table: None,
            alias: None,
            joins: Vec::new(),
            wheres: ConditionBuilder::new(),
            group_by: Vec::new(),
            havings: ConditionBuilder::new(),
            order_by: IndexMap::new(),
            pagination: Pagination::default(),
            flags: IndexMap::new(),
        }
    }
}

impl Select {
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

    // ========== 列 ==========

    /// 添加查询列（可多次调用），不设置时为 `*`
    pub fn select(&mut self, column: &str) -> &mut Self {
        self.columns.push(Column {
            source: ColumnSource::Field(column.to_string()),
            alias: None,
        });
        self
    }

    pub fn select_as(&mut self, column: &str, alias: &str) -> &mut Self {
        self.columns.push(Column {
            source: ColumnSource::Field(column.to_string()),
            alias: Some(alias.to_string()),
        });
        self
    }

    /// 添加表达式列，表达式原样输出
    pub fn select_expr(&mut self, expr: Expression, alias: Option<&str>) -> &mut Self {
        self.columns.push(Column {
            source: ColumnSource::Expr(expr),
            alias: alias.map(str::to_string),
        });
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn reset_select(&mut self) -> &mut Self {
        self.columns.clear();
        self
    }

    // ========== FROM / JOIN ==========

    pub fn from(&mut self, table: &str, alias: Option<&str>) -> &mut Self {
        self.table = Some(table.to_string());
        self.alias = alias.map(str::to_string);
        self
    }

    pub fn from_alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// INNER JOIN
    pub fn join(&mut self, left: &str, right: &str, predicate: &str) -> Result<&mut Self> {
        self.add_join(JoinType::Inner, left, right, None, predicate)
    }

    pub fn left_join(&mut self, left: &str, right: &str, predicate: &str) -> Result<&mut Self> {
        self.add_join(JoinType::Left, left, right, None, predicate)
    }

    pub fn right_join(&mut self, left: &str, right: &str, predicate: &str) -> Result<&mut Self> {
        self.add_join(JoinType::Right, left, right, None, predicate)
    }

    /// 以字符串指定 JOIN 类型（`INNER` / `LEFT` / `RIGHT`，不区分大小写）
    pub fn join_with(
        &mut self,
        kind: &str,
        left: &str,
        right: &str,
        right_alias: Option<&str>,
        predicate: &str,
    ) -> Result<&mut Self> {
        let kind = kind.parse::<JoinType>()?;
        self.add_join(kind, left, right, right_alias, predicate)
    }

    pub fn add_join(
        &mut self,
        kind: JoinType,
        left: &str,
        right: &str,
        right_alias: Option<&str>,
        predicate: &str,
    ) -> Result<&mut Self> {
        // 同一张表第二次出现时必须有别名
        let name = right_alias.unwrap_or(right);
        if self.referenced_names().any(|existing| existing == name) {
            return Err(ActiveSqlError::MissingAlias(right.to_string()));
        }
        self.joins.push(Join {
            kind,
            left: left.to_string(),
            right: right.to_string(),
            right_alias: right_alias.map(str::to_string),
            predicate: predicate.to_string(),
        });
        Ok(self)
    }

    fn referenced_names(&self) -> impl Iterator<Item = &str> {
        let from = self.alias.as_deref().or(self.table.as_deref());
        from.into_iter().chain(
            self.joins
                .iter()
                .map(|j| j.right_alias.as_deref().unwrap_or(&j.right)),
        )
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn reset_joins(&mut self) -> &mut Self {
        self.joins.clear();
        self
    }

    // ========== GROUP BY / ORDER BY ==========

    pub fn group_by(&mut self, field: &str) -> &mut Self {
        self.group_by.push(field.to_string());
        self
    }

    pub fn group_bys(&self) -> &[String] {
        &self.group_by
    }

    pub fn reset_group_by(&mut self) -> &mut Self {
        self.group_by.clear();
        self
    }

    /// 同一字段再次设置时覆盖方向，保留原位置
    pub fn order_by(&mut self, field: &str, direction: Direction) -> &mut Self {
        self.order_by.insert(field.to_string(), direction);
        self
    }

    pub fn orders(&self) -> &IndexMap<String, Direction> {
        &self.order_by
    }

    pub fn reset_order_by(&mut self) -> &mut Self {
        self.order_by.clear();
        self
    }

    // ========== 标记 ==========

    /// 附加在查询上的标记，模型层用它记录模型名与取值方式（`fetch = one`）
    pub fn flag(&mut self, key: &str, value: &str) -> &mut Self {
        self.flags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get_flag(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }

    // ========== 生成 ==========

    /// 生成完整 SQL；没有表名时返回空字符串
    pub fn sql(&self) -> String {
        let table = match &self.table {
            Some(t) => t,
            None => return String::new(),
        };
        let d = self.dialect.as_ref();

        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| c.render(d))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut from = d.quote_table(table);
        if let Some(alias) = &self.alias {
            from.push_str(" AS ");
            from.push_str(&d.quote_identifier(alias));
        }

        let joins = self
            .joins
            .iter()
            .map(|j| j.render(d))
            .collect::<Vec<_>>()
            .join(" ");

        let group_by = if self.group_by.is_empty() {
            String::new()
        } else {
            format!(
                "GROUP BY {}",
                self.group_by
                    .iter()
                    .map(|f| d.quote_field(f))
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };

        let order_by = if self.order_by.is_empty() {
            String::new()
        } else {
            format!(
                "ORDER BY {}",
                self.order_by
                    .iter()
                    .map(|(f, dir)| format!("{} {}", d.quote_field(f), dir.as_sql()))
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };

        join_parts([
            "SELECT",
            columns.as_str(),
            "FROM",
            from.as_str(),
            joins.as_str(),
            self.build_where_sql(d).as_str(),
            group_by.as_str(),
            self.build_having_sql(d).as_str(),
            order_by.as_str(),
            self.build_paginate_sql().as_str(),
        ])
    }

    /// WHERE 绑定值在前，HAVING 绑定值在后
    pub fn params(&self) -> Vec<Value> {
        let mut params = self.wheres.parameters().to_vec();
        params.extend_from_slice(self.havings.parameters());
        params
    }

    pub fn statement(&self) -> Result<Statement> {
        if self.table.is_none() {
            return Err(ActiveSqlError::MissingTable);
        }
        Ok(Statement::new(self.sql(), self.params()))
    }

    pub fn reset(&mut self) -> &mut Self {
        let dialect = Arc::clone(&self.dialect);
        *self = Self::default();
        self.dialect = dialect;
        self
    }
}

impl TableName for Select {
    fn table_slot(&self) -> &Option<String> {
        &self.table
    }

    fn table_slot_mut(&mut self) -> &mut Option<String> {
        &mut self.table
    }
}

impl Where for Select {
    fn where_builder(&self) -> &ConditionBuilder {
        &self.wheres
    }

    fn where_builder_mut(&mut self) -> &mut ConditionBuilder {
        &mut self.wheres
    }
}

impl Having for Select {
    fn having_builder(&self) -> &ConditionBuilder {
        &self.havings
    }

    fn having_builder_mut(&mut self) -> &mut ConditionBuilder {
        &mut self.havings
    }
}

impl Paginate for Select {
    fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    fn pagination_mut(&mut self) -> &mut Pagination {
        &mut self.pagination
    }
}
