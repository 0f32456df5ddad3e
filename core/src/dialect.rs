//! 数据库方言
//!
//! 提供统一的接口来处理不同数据库的标识符转义。渲染出的 SQL 一律使用 `?`
//! 作为占位符，由连接层（见 [`DbDriver::convert_placeholders`](crate::db_pool::DbDriver::convert_placeholders)）
//! 转换为驱动需要的格式。

use std::fmt::Debug;

/// 方言 trait
///
/// 所有方法必须是确定性的、无副作用的。
pub trait Dialect: Debug + Send + Sync {
    /// 方言名称，用于日志
    fn name(&self) -> &'static str;

    /// 转义单个标识符（不拆分 `.`）
    ///
    /// * ANSI / PostgreSQL / SQLite: `"name"`
    /// * MySQL: `` `name` ``
    fn quote_identifier(&self, name: &str) -> String;

    /// 转义表名，支持 `schema.table`
    fn quote_table(&self, name: &str) -> String {
        self.quote_field(name)
    }

    /// 转义字段名
    ///
    /// - `table.column` 会拆分后分别转义
    /// - `*` 与 `table.*` 中的 `*` 保持原样
    /// - 包含括号的表达式（如 `COUNT(id)`）原样输出
    fn quote_field(&self, name: &str) -> String {
        if name.contains('(') {
            return name.to_string();
        }
        name.split('.')
            .map(|part| {
                if part == "*" {
                    part.to_string()
                } else {
                    self.quote_identifier(part)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// INSERT 是否支持 `RETURNING <column>`
    fn supports_returning(&self) -> bool {
        false
    }
}

/// 用给定的引号包裹标识符，内部出现的引号会被双写
fn wrap(name: &str, quote: char) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push(quote);
    for ch in name.chars() {
        if ch == quote {
            out.push(quote);
        }
        out.push(ch);
    }
    out.push(quote);
    out
}

/// 标准 SQL 方言，使用双引号
#[derive(Debug, Clone, Copy, Default)]
pub struct Ansi;

impl Dialect for Ansi {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn quote_identifier(&self, name: &str) -> String {
        wrap(name, '"')
    }
}

/// MySQL / MariaDB，使用反引号
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        wrap(name, '`')
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, name: &str) -> String {
        wrap(name, '"')
    }

    fn supports_returning(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, name: &str) -> String {
        wrap(name, '"')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_quote_identifier() {
        assert_eq!(Ansi.quote_identifier("user"), "\"user\"");
        assert_eq!(Ansi.quote_identifier("user_name"), "\"user_name\"");
    }

    #[test]
    fn test_mysql_quote_identifier() {
        assert_eq!(MySql.quote_identifier("user"), "`user`");
        assert_eq!(MySql.quote_table("app.users"), "`app`.`users`");
    }

    #[test]
    fn test_embedded_quotes_are_doubled() {
        assert_eq!(Ansi.quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(MySql.quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_quote_field_dotted_and_star() {
        assert_eq!(Ansi.quote_field("u.name"), "\"u\".\"name\"");
        assert_eq!(Ansi.quote_field("*"), "*");
        assert_eq!(Ansi.quote_field("u.*"), "\"u\".*");
        assert_eq!(Ansi.quote_field("COUNT(id)"), "COUNT(id)");
    }

    #[test]
    fn test_supports_returning() {
        assert!(Postgres.supports_returning());
        assert!(!Sqlite.supports_returning());
        assert!(!MySql.supports_returning());
        assert!(!Ansi.supports_returning());
    }
}
