//! 条件构建器
//!
//! 用于构建 WHERE / HAVING 中的条件树。每个节点要么是单个比较（`field op ?`），
//! 要么是一个带括号的嵌套分组；节点带有 AND / OR 连接标记。
//!
//! 绑定值在添加条件时按顺序收集，与渲染出的 `?` 按深度优先、从左到右一一对应。
//!
//! ```rust,ignore
//! use activesql::{ConditionBuilder, dialect::Ansi};
//!
//! let mut cb = ConditionBuilder::new();
//! cb.and_with("age", ">", 18)
//!     .or_group(|g| {
//!         g.and_with("city", "=", "London").and_with("active", "=", true);
//!     });
//! assert_eq!(cb.render(&Ansi), "\"age\" > ? OR (\"city\" = ? AND \"active\" = ?)");
//! ```

use std::fmt::Write;

use crate::dialect::Dialect;
use crate::value::Value;

/// 条件类型：AND 或 OR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionType {
    And,
    Or,
}

impl ConditionType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ConditionType::And => "AND",
            ConditionType::Or => "OR",
        }
    }
}

/// 条件项：可以是单个条件或条件组
///
/// 第一个节点的连接标记会被记录，但渲染时忽略。
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Predicate {
        join: ConditionType,
        field: String,
        operator: String,
        value: Value,
    },
    Group {
        join: ConditionType,
        children: Vec<Condition>,
    },
}

impl Condition {
    pub fn join(&self) -> ConditionType {
        match self {
            Condition::Predicate { join, .. } | Condition::Group { join, .. } => *join,
        }
    }

    /// 该节点（包括子节点）产生的占位符数量
    pub fn placeholder_count(&self) -> usize {
        match self {
            Condition::Predicate { .. } => 1,
            Condition::Group { children, .. } => {
                children.iter().map(Condition::placeholder_count).sum()
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionBuilder {
    parts: Vec<Condition>,
    params: Vec<Value>,
}

impl ConditionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加 AND 条件
    pub fn and_with(
        &mut self,
        field: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.add_condition(ConditionType::And, field, operator, value)
    }

    /// 添加 OR 条件
    pub fn or_with(&mut self, field: &str, operator: &str, value: impl Into<Value>) -> &mut Self {
        self.add_condition(ConditionType::Or, field, operator, value)
    }

    /// AND 条件分组
    /// 示例：`cb.and_group(|g| { g.and_with("a", "=", 1).or_with("b", "=", 2); })`
    /// 生成：`AND ("a" = ? OR "b" = ?)`
    pub fn and_group<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut ConditionBuilder),
    {
        self.add_group(ConditionType::And, f)
    }

    /// OR 条件分组
    pub fn or_group<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut ConditionBuilder),
    {
        self.add_group(ConditionType::Or, f)
    }

    pub fn add_condition(
        &mut self,
        join: ConditionType,
        field: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> &mut Self {
        let value = value.into();
        self.params.push(value.clone());
        self.parts.push(Condition::Predicate {
            join,
            field: field.to_string(),
            operator: operator.to_string(),
            value,
        });
        self
    }

    /// 在新的子构建器上执行 `f`，并把结果作为一个分组追加进来。
    ///
    /// 子构建器的绑定值按添加顺序合并到当前构建器。空分组不会被追加。
    pub fn add_group<F>(&mut self, join: ConditionType, f: F) -> &mut Self
    where
        F: FnOnce(&mut ConditionBuilder),
    {
        let mut child = ConditionBuilder::new();
        f(&mut child);
        if child.parts.is_empty() {
            return self;
        }
        self.params.extend(child.params);
        self.parts.push(Condition::Group {
            join,
            children: child.parts,
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.parts
    }

    /// 构建期收集的绑定值，渲染时不会重新生成
    pub fn parameters(&self) -> &[Value] {
        &self.params
    }

    pub fn has_conditions(&self) -> bool {
        !self.parts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn clear(&mut self) {
        self.parts.clear();
        self.params.clear();
    }

    /// 生成条件 SQL（不包含 WHERE / HAVING 关键字），空构建器返回空字符串
    pub fn render(&self, dialect: &dyn Dialect) -> String {
        let mut sql = String::new();
        render_parts(&self.parts, dialect, &mut sql);
        sql
    }
}

fn render_parts(parts: &[Condition], dialect: &dyn Dialect, sql: &mut String) {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            sql.push(' ');
            sql.push_str(part.join().as_sql());
            sql.push(' ');
        }
        match part {
            Condition::Predicate {
                field, operator, ..
            } => {
                // String 的 fmt::Write 不会失败
                let _ = write!(sql, "{} {} ?", dialect.quote_field(field), operator);
            }
            Condition::Group { children, .. } => {
                sql.push('(');
                render_parts(children, dialect, sql);
                sql.push(')');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Ansi, MySql};

    fn count_placeholders(sql: &str) -> usize {
        sql.matches('?').count()
    }

    // ========== 基本条件测试 ==========
    #[test]
    fn test_empty_builder() {
        let cb = ConditionBuilder::new();
        assert_eq!(cb.render(&Ansi), "");
        assert!(cb.parameters().is_empty());
        assert!(!cb.has_conditions());
    }

    #[test]
    fn test_single_condition() {
        let mut cb = ConditionBuilder::new();
        cb.and_with("name", "=", "Alex");
        assert_eq!(cb.render(&Ansi), "\"name\" = ?");
        assert_eq!(cb.parameters(), &[Value::from("Alex")]);
        assert!(cb.has_conditions());
    }

    #[test]
    fn test_simple_or() {
        let mut cb = ConditionBuilder::new();
        cb.and_with("name", "=", "Alex")
            .or_with("name", "=", "Alexander");
        assert_eq!(cb.render(&Ansi), "\"name\" = ? OR \"name\" = ?");
        assert_eq!(
            cb.parameters(),
            &[Value::from("Alex"), Value::from("Alexander")]
        );
    }

    #[test]
    fn test_leading_or_is_dropped() {
        let mut cb = ConditionBuilder::new();
        cb.or_with("name", "=", "Alex");
        assert_eq!(cb.render(&Ansi), "\"name\" = ?");
        // 连接标记仍然被记录
        assert_eq!(cb.conditions()[0].join(), ConditionType::Or);
    }

    #[test]
    fn test_leading_or_group_is_dropped() {
        let mut cb = ConditionBuilder::new();
        cb.or_group(|g| {
            g.or_with("a", "=", 1);
        });
        assert_eq!(cb.render(&Ansi), "(\"a\" = ?)");
    }

    // ========== 条件分组测试 ==========
    #[test]
    fn test_and_then_or_group() {
        let mut cb = ConditionBuilder::new();
        cb.and_with("field1", "=", "v1").and_group(|g| {
            g.and_with("field2", "=", "v2").or_with("field3", "=", "v3");
        });
        assert_eq!(
            cb.render(&Ansi),
            "\"field1\" = ? AND (\"field2\" = ? OR \"field3\" = ?)"
        );
        assert_eq!(
            cb.parameters(),
            &[Value::from("v1"), Value::from("v2"), Value::from("v3")]
        );
    }

    #[test]
    fn test_group_structure() {
        let mut cb = ConditionBuilder::new();
        cb.and_with("name", "=", "Alex").and_group(|g| {
            g.and_with("city", "=", "London")
                .or_with("city", "=", "Toronto");
        });

        assert_eq!(
            cb.conditions(),
            &[
                Condition::Predicate {
                    join: ConditionType::And,
                    field: "name".to_string(),
                    operator: "=".to_string(),
                    value: Value::from("Alex"),
                },
                Condition::Group {
                    join: ConditionType::And,
                    children: vec![
                        Condition::Predicate {
                            join: ConditionType::And,
                            field: "city".to_string(),
                            operator: "=".to_string(),
                            value: Value::from("London"),
                        },
                        Condition::Predicate {
                            join: ConditionType::Or,
                            field: "city".to_string(),
                            operator: "=".to_string(),
                            value: Value::from("Toronto"),
                        },
                    ],
                },
            ]
        );
    }

    #[test]
    fn test_complex_nesting() {
        let mut cb = ConditionBuilder::new();
        cb.and_with("name", "=", "Alex")
            .or_with("name", "=", "Lucie")
            .and_group(|g| {
                g.and_with("city", "=", "London")
                    .and_with("country", "=", "GB");
            })
            .or_group(|g| {
                g.and_with("city", "=", "Toronto")
                    .and_with("country", "=", "CA")
                    .or_group(|g2| {
                        g2.and_with("active", "!=", true);
                    });
            });

        let sql = cb.render(&Ansi);
        assert_eq!(
            sql,
            "\"name\" = ? OR \"name\" = ? AND (\"city\" = ? AND \"country\" = ?) \
             OR (\"city\" = ? AND \"country\" = ? OR (\"active\" != ?))"
        );
        assert_eq!(
            cb.parameters(),
            &[
                Value::from("Alex"),
                Value::from("Lucie"),
                Value::from("London"),
                Value::from("GB"),
                Value::from("Toronto"),
                Value::from("CA"),
                Value::from(true),
            ]
        );
        assert_eq!(count_placeholders(&sql), cb.parameters().len());
    }

    #[test]
    fn test_deeply_nested_placeholder_alignment() {
        let mut cb = ConditionBuilder::new();
        cb.and_group(|a| {
            a.and_with("a", "=", 1).or_group(|b| {
                b.and_with("b", "=", 2).and_group(|c| {
                    c.and_with("c", "=", 3).or_with("d", "=", 4);
                });
            });
        })
        .or_with("e", "<", 5);

        let sql = cb.render(&Ansi);
        assert_eq!(
            sql,
            "(\"a\" = ? OR (\"b\" = ? AND (\"c\" = ? OR \"d\" = ?))) OR \"e\" < ?"
        );
        let expected: Vec<Value> = (1..=5).map(Value::from).collect();
        assert_eq!(cb.parameters(), expected.as_slice());
        assert_eq!(
            cb.conditions()
                .iter()
                .map(Condition::placeholder_count)
                .sum::<usize>(),
            count_placeholders(&sql)
        );
    }

    #[test]
    fn test_empty_group_is_skipped() {
        let mut cb = ConditionBuilder::new();
        cb.and_with("a", "=", 1).and_group(|_| {});
        assert_eq!(cb.render(&Ansi), "\"a\" = ?");
        assert_eq!(cb.len(), 1);
    }

    // ========== 渲染测试 ==========
    #[test]
    fn test_render_is_idempotent() {
        let mut cb = ConditionBuilder::new();
        cb.and_with("a", "=", 1).or_group(|g| {
            g.and_with("b", "=", 2);
        });
        let first = cb.render(&Ansi);
        let second = cb.render(&Ansi);
        assert_eq!(first, second);
        assert_eq!(cb.parameters().len(), 2);
    }

    #[test]
    fn test_render_with_mysql_dialect() {
        let mut cb = ConditionBuilder::new();
        cb.and_with("u.name", "LIKE", "A%");
        assert_eq!(cb.render(&MySql), "`u`.`name` LIKE ?");
    }

    #[test]
    fn test_clear() {
        let mut cb = ConditionBuilder::new();
        cb.and_with("a", "=", 1);
        cb.clear();
        assert_eq!(cb.render(&Ansi), "");
        assert!(cb.parameters().is_empty());
    }
}
