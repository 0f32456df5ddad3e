//! 子句组件
//!
//! `Select` / `Insert` / `Update` / `Delete` 通过实现这些 trait 获得对应的链式方法。
//! 每个 trait 只要求实现者暴露自己持有的那一小块状态，其余方法都有默认实现。

use crate::condition::{Condition, ConditionBuilder, ConditionType};
use crate::dialect::Dialect;
use crate::value::{Value, ValueMap};

/// 表名
pub trait TableName {
    #[doc(hidden)]
    fn table_slot(&self) -> &Option<String>;
    #[doc(hidden)]
    fn table_slot_mut(&mut self) -> &mut Option<String>;

    fn table(&mut self, name: &str) -> &mut Self
    where
        Self: Sized,
    {
        *self.table_slot_mut() = Some(name.to_string());
        self
    }

    fn table_name(&self) -> Option<&str> {
        self.table_slot().as_deref()
    }
}

/// WHERE 子句
pub trait Where {
    #[doc(hidden)]
    fn where_builder(&self) -> &ConditionBuilder;
    #[doc(hidden)]
    fn where_builder_mut(&mut self) -> &mut ConditionBuilder;

    /// 添加 AND WHERE 条件
    fn and_where(&mut self, field: &str, operator: &str, value: impl Into<Value>) -> &mut Self
    where
        Self: Sized,
    {
        self.where_builder_mut()
            .add_condition(ConditionType::And, field, operator, value);
        self
    }

    /// 添加 OR WHERE 条件
    fn or_where(&mut self, field: &str, operator: &str, value: impl Into<Value>) -> &mut Self
    where
        Self: Sized,
    {
        self.where_builder_mut()
            .add_condition(ConditionType::Or, field, operator, value);
        self
    }

    /// AND 分组：`q.and_where_group(|g| { g.and_with("a", "=", 1).or_with("b", "=", 2); })`
    fn and_where_group<F>(&mut self, f: F) -> &mut Self
    where
        Self: Sized,
        F: FnOnce(&mut ConditionBuilder),
    {
        self.where_builder_mut().add_group(ConditionType::And, f);
        self
    }

    fn or_where_group<F>(&mut self, f: F) -> &mut Self
    where
        Self: Sized,
        F: FnOnce(&mut ConditionBuilder),
    {
        self.where_builder_mut().add_group(ConditionType::Or, f);
        self
    }

    fn wheres(&self) -> &[Condition] {
        self.where_builder().conditions()
    }

    fn where_params(&self) -> &[Value] {
        self.where_builder().parameters()
    }

    /// `WHERE ...`，没有条件时返回空字符串
    fn build_where_sql(&self, dialect: &dyn Dialect) -> String {
        let builder = self.where_builder();
        if !builder.has_conditions() {
            return String::new();
        }
        format!("WHERE {}", builder.render(dialect))
    }

    fn reset_where(&mut self) -> &mut Self
    where
        Self: Sized,
    {
        self.where_builder_mut().clear();
        self
    }
}

/// HAVING 子句
pub trait Having {
    #[doc(hidden)]
    fn having_builder(&self) -> &ConditionBuilder;
    #[doc(hidden)]
    fn having_builder_mut(&mut self) -> &mut ConditionBuilder;

    fn and_having(&mut self, field: &str, operator: &str, value: impl Into<Value>) -> &mut Self
    where
        Self: Sized,
    {
        self.having_builder_mut()
            .add_condition(ConditionType::And, field, operator, value);
        self
    }

    fn or_having(&mut self, field: &str, operator: &str, value: impl Into<Value>) -> &mut Self
    where
        Self: Sized,
    {
        self.having_builder_mut()
            .add_condition(ConditionType::Or, field, operator, value);
        self
    }

    fn and_having_group<F>(&mut self, f: F) -> &mut Self
    where
        Self: Sized,
        F: FnOnce(&mut ConditionBuilder),
    {
        self.having_builder_mut().add_group(ConditionType::And, f);
        self
    }

    fn or_having_group<F>(&mut self, f: F) -> &mut Self
    where
        Self: Sized,
        F: FnOnce(&mut ConditionBuilder),
    {
        self.having_builder_mut().add_group(ConditionType::Or, f);
        self
    }

    fn havings(&self) -> &[Condition] {
        self.having_builder().conditions()
    }

    fn having_params(&self) -> &[Value] {
        self.having_builder().parameters()
    }

    /// `HAVING ...`，没有条件时返回空字符串
    fn build_having_sql(&self, dialect: &dyn Dialect) -> String {
        let builder = self.having_builder();
        if !builder.has_conditions() {
            return String::new();
        }
        format!("HAVING {}", builder.render(dialect))
    }

    fn reset_having(&mut self) -> &mut Self
    where
        Self: Sized,
    {
        self.having_builder_mut().clear();
        self
    }
}

/// INSERT / UPDATE 的字段值
pub trait Values {
    #[doc(hidden)]
    fn value_map(&self) -> &ValueMap;
    #[doc(hidden)]
    fn value_map_mut(&mut self) -> &mut ValueMap;

    /// 批量设置，已存在的字段被覆盖但保留原位置
    fn values<I, K, V>(&mut self, values: I) -> &mut Self
    where
        Self: Sized,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let map = self.value_map_mut();
        for (field, value) in values {
            map.insert(field.into(), value.into());
        }
        self
    }

    fn value(&mut self, field: &str, value: impl Into<Value>) -> &mut Self
    where
        Self: Sized,
    {
        self.value_map_mut().insert(field.to_string(), value.into());
        self
    }

    fn get_value(&self, field: &str) -> Option<&Value> {
        self.value_map().get(field)
    }

    fn reset_values(&mut self) -> &mut Self
    where
        Self: Sized,
    {
        self.value_map_mut().clear();
        self
    }
}

/// LIMIT / OFFSET 状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<u64>,
    pub offset: u64,
}

/// 分页：`LIMIT n` 或 `LIMIT n OFFSET m`
pub trait Paginate {
    #[doc(hidden)]
    fn pagination(&self) -> &Pagination;
    #[doc(hidden)]
    fn pagination_mut(&mut self) -> &mut Pagination;

    fn limit(&mut self, limit: u64) -> &mut Self
    where
        Self: Sized,
    {
        self.pagination_mut().limit = Some(limit);
        self
    }

    fn offset(&mut self, offset: u64) -> &mut Self
    where
        Self: Sized,
    {
        self.pagination_mut().offset = offset;
        self
    }

    fn get_limit(&self) -> Option<u64> {
        self.pagination().limit
    }

    fn get_offset(&self) -> u64 {
        self.pagination().offset
    }

    /// 没有 limit 时返回空字符串；offset 为 0 时不输出 OFFSET
    fn build_paginate_sql(&self) -> String {
        let p = self.pagination();
        match p.limit {
            None => String::new(),
            Some(limit) if p.offset == 0 => format!("LIMIT {}", limit),
            Some(limit) => format!("LIMIT {} OFFSET {}", limit, p.offset),
        }
    }

    fn reset_limit(&mut self) -> &mut Self
    where
        Self: Sized,
    {
        self.pagination_mut().limit = None;
        self
    }

    fn reset_offset(&mut self) -> &mut Self
    where
        Self: Sized,
    {
        self.pagination_mut().offset = 0;
        self
    }
}

/// 拼接非空片段
pub(crate) fn join_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
