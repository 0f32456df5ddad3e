//! 基于 sqlx 的连接池与同步连接
//!
//! [`SqlxConnection`] 持有一个 current-thread tokio runtime，每次调用都在其上 `block_on`，
//! 因此不能在另一个 tokio runtime 内部调用。

#[cfg(any(feature = "mysql", feature = "postgres", feature = "sqlite"))]
use sqlx::Pool;
use std::sync::Arc;

use crate::config::DbConfig;
use crate::connection::{Connection, ExecResult, Row};
use crate::dialect::{Dialect, MySql, Postgres, Sqlite};
use crate::error::{ActiveSqlError, Result};
use crate::value::Value;

/// 把 Value 绑定到 sqlx 查询
///
/// 三种数据库都支持的类型直接绑定，Null 以 `Option<String>::None` 绑定。
#[cfg(any(feature = "mysql", feature = "postgres", feature = "sqlite"))]
macro_rules! bind_value {
    ($query:expr, $value:expr) => {
        $query = match $value {
            Value::Null => $query.bind(Option::<String>::None),
            Value::Bool(b) => $query.bind(*b),
            Value::Int64(i) => $query.bind(*i),
            Value::Int32(i) => $query.bind(*i),
            Value::Int16(i) => $query.bind(*i),
            Value::Float64(f) => $query.bind(*f),
            Value::Float32(f) => $query.bind(*f),
            Value::String(s) => $query.bind(s.clone()),
            Value::Bytes(b) => $query.bind(b.clone()),
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbDriver {
    MySql,
    Postgres,
    Sqlite,
}

impl DbDriver {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Ok(DbDriver::MySql)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DbDriver::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(DbDriver::Sqlite)
        } else {
            Err(ActiveSqlError::UnsupportedDatabase(url.to_string()))
        }
    }

    pub fn placeholder(&self, index: usize) -> String {
        match self {
            DbDriver::MySql | DbDriver::Sqlite => "?".to_string(),
            DbDriver::Postgres => format!("${}", index + 1),
        }
    }

    /// 把 `?` 占位符转换为驱动需要的格式
    ///
    /// 引号（`'`、`"`、`` ` ``）内的 `?` 保持原样。
    pub fn convert_placeholders(&self, sql: &str) -> String {
        match self {
            DbDriver::MySql | DbDriver::Sqlite => sql.to_string(),
            DbDriver::Postgres => {
                let mut result = String::with_capacity(sql.len() + 8);
                let mut index = 0;
                let mut quote: Option<char> = None;
                for ch in sql.chars() {
                    match quote {
                        Some(q) if ch == q => quote = None,
                        Some(_) => {}
                        None if ch == '\'' || ch == '"' || ch == '`' => quote = Some(ch),
                        None if ch == '?' => {
                            result.push_str(&self.placeholder(index));
                            index += 1;
                            continue;
                        }
                        None => {}
                    }
                    result.push(ch);
                }
                result
            }
        }
    }

    pub fn dialect(&self) -> Arc<dyn Dialect> {
        match self {
            DbDriver::MySql => Arc::new(MySql),
            DbDriver::Postgres => Arc::new(Postgres),
            DbDriver::Sqlite => Arc::new(Sqlite),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbPool {
    driver: DbDriver,
    #[cfg(feature = "mysql")]
    mysql: Option<Arc<Pool<sqlx::MySql>>>,
    #[cfg(feature = "postgres")]
    pg: Option<Arc<Pool<sqlx::Postgres>>>,
    #[cfg(feature = "sqlite")]
    sqlite: Option<Arc<Pool<sqlx::Sqlite>>>,
}

impl DbPool {
    /// 按配置连接并创建 DbPool
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let driver = DbDriver::from_url(&config.url)?;
        // 内存库只能有一个连接，且连接不能被回收
        let (max, in_memory) = if config.is_in_memory() {
            (1, true)
        } else {
            (config.max_connections.max(1), false)
        };

        match driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = sqlx::pool::PoolOptions::<sqlx::MySql>::new()
                    .max_connections(max)
                    .connect(&config.url)
                    .await?;
                Ok(Self::from_mysql_pool(Arc::new(pool)))
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = sqlx::pool::PoolOptions::<sqlx::Postgres>::new()
                    .max_connections(max)
                    .connect(&config.url)
                    .await?;
                Ok(Self::from_postgres_pool(Arc::new(pool)))
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let mut options =
                    sqlx::pool::PoolOptions::<sqlx::Sqlite>::new().max_connections(max);
                if in_memory {
                    options = options.idle_timeout(None).max_lifetime(None);
                }
                let pool = options.connect(&config.url).await?;
                Ok(Self::from_sqlite_pool(Arc::new(pool)))
            }
            #[allow(unreachable_patterns)]
            _ => {
                let _ = (max, in_memory);
                Err(ActiveSqlError::UnsupportedDatabase(format!(
                    "driver {:?} is not enabled, enable the matching cargo feature",
                    driver
                )))
            }
        }
    }

    /// 从 MySQL Pool 创建 DbPool
    #[cfg(feature = "mysql")]
    pub fn from_mysql_pool(pool: Arc<Pool<sqlx::MySql>>) -> Self {
        Self {
            driver: DbDriver::MySql,
            mysql: Some(pool),
            #[cfg(feature = "postgres")]
            pg: None,
            #[cfg(feature = "sqlite")]
            sqlite: None,
        }
    }

    /// 从 PostgreSQL Pool 创建 DbPool
    #[cfg(feature = "postgres")]
    pub fn from_postgres_pool(pool: Arc<Pool<sqlx::Postgres>>) -> Self {
        Self {
            driver: DbDriver::Postgres,
            #[cfg(feature = "mysql")]
            mysql: None,
            pg: Some(pool),
            #[cfg(feature = "sqlite")]
            sqlite: None,
        }
    }

    /// 从 SQLite Pool 创建 DbPool
    #[cfg(feature = "sqlite")]
    pub fn from_sqlite_pool(pool: Arc<Pool<sqlx::Sqlite>>) -> Self {
        Self {
            driver: DbDriver::Sqlite,
            #[cfg(feature = "mysql")]
            mysql: None,
            #[cfg(feature = "postgres")]
            pg: None,
            sqlite: Some(pool),
        }
    }

    pub fn driver(&self) -> DbDriver {
        self.driver
    }

    #[cfg(feature = "mysql")]
    pub fn mysql_pool(&self) -> Option<&Pool<sqlx::MySql>> {
        self.mysql.as_deref()
    }

    #[cfg(feature = "postgres")]
    pub fn pg_pool(&self) -> Option<&Pool<sqlx::Postgres>> {
        self.pg.as_deref()
    }

    #[cfg(feature = "sqlite")]
    pub fn sqlite_pool(&self) -> Option<&Pool<sqlx::Sqlite>> {
        self.sqlite.as_deref()
    }

    pub fn convert_sql(&self, sql: &str) -> String {
        self.driver.convert_placeholders(sql)
    }

    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        let sql = self.convert_sql(sql);
        match self.driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = self.mysql.as_deref().ok_or(ActiveSqlError::NoPoolAvailable)?;
                let mut query = sqlx::query(&sql);
                for value in params {
                    bind_value!(query, value);
                }
                let result = query.execute(pool).await?;
                let mut exec = ExecResult::new(result.rows_affected());
                if result.last_insert_id() > 0 {
                    exec.last_insert_id = Some(Value::Int64(result.last_insert_id() as i64));
                }
                Ok(exec)
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = self.pg.as_deref().ok_or(ActiveSqlError::NoPoolAvailable)?;
                let mut query = sqlx::query(&sql);
                for value in params {
                    bind_value!(query, value);
                }
                // PostgreSQL 没有 last_insert_id，自增主键通过 RETURNING 取回
                if sql.contains(" RETURNING ") {
                    let rows = query.fetch_all(pool).await?;
                    let mut exec = ExecResult::new(rows.len() as u64);
                    if let Some(row) = rows.first() {
                        exec.last_insert_id = decode::pg_row(row)?.into_values().next();
                    }
                    return Ok(exec);
                }
                let result = query.execute(pool).await?;
                Ok(ExecResult::new(result.rows_affected()))
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = self.sqlite.as_deref().ok_or(ActiveSqlError::NoPoolAvailable)?;
                let mut query = sqlx::query(&sql);
                for value in params {
                    bind_value!(query, value);
                }
                let result = query.execute(pool).await?;
                let mut exec = ExecResult::new(result.rows_affected());
                if sql.trim_start().to_ascii_uppercase().starts_with("INSERT") {
                    exec.last_insert_id = Some(Value::Int64(result.last_insert_rowid()));
                }
                Ok(exec)
            }
            #[allow(unreachable_patterns)]
            _ => {
                let _ = params;
                Err(ActiveSqlError::NoPoolAvailable)
            }
        }
    }

    pub async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let sql = self.convert_sql(sql);
        match self.driver {
            #[cfg(feature = "mysql")]
            DbDriver::MySql => {
                let pool = self.mysql.as_deref().ok_or(ActiveSqlError::NoPoolAvailable)?;
                let mut query = sqlx::query(&sql);
                for value in params {
                    bind_value!(query, value);
                }
                let rows = query.fetch_all(pool).await?;
                rows.iter().map(decode::mysql_row).collect()
            }
            #[cfg(feature = "postgres")]
            DbDriver::Postgres => {
                let pool = self.pg.as_deref().ok_or(ActiveSqlError::NoPoolAvailable)?;
                let mut query = sqlx::query(&sql);
                for value in params {
                    bind_value!(query, value);
                }
                let rows = query.fetch_all(pool).await?;
                rows.iter().map(decode::pg_row).collect()
            }
            #[cfg(feature = "sqlite")]
            DbDriver::Sqlite => {
                let pool = self.sqlite.as_deref().ok_or(ActiveSqlError::NoPoolAvailable)?;
                let mut query = sqlx::query(&sql);
                for value in params {
                    bind_value!(query, value);
                }
                let rows = query.fetch_all(pool).await?;
                rows.iter().map(decode::sqlite_row).collect()
            }
            #[allow(unreachable_patterns)]
            _ => {
                let _ = params;
                Err(ActiveSqlError::NoPoolAvailable)
            }
        }
    }
}

/// 按列类型把驱动的行解码为 [`Row`]
#[cfg(any(feature = "mysql", feature = "postgres", feature = "sqlite"))]
mod decode {
    use sqlx::{Column, Row as _, TypeInfo, ValueRef};

    use crate::connection::Row;
    use crate::error::{ActiveSqlError, Result};
    use crate::value::Value;

    fn decode_err(column: &str, e: sqlx::Error) -> ActiveSqlError {
        ActiveSqlError::Decode(format!("column '{}': {}", column, e))
    }

    #[cfg(feature = "sqlite")]
    pub(super) fn sqlite_row(row: &sqlx::sqlite::SqliteRow) -> Result<Row> {
        let mut out = Row::with_capacity(row.len());
        for (i, column) in row.columns().iter().enumerate() {
            let name = column.name();
            let raw = row.try_get_raw(i).map_err(|e| decode_err(name, e))?;
            let value = if raw.is_null() {
                Value::Null
            } else {
                // SQLite 按存储类型解码，而不是声明类型
                let type_name = raw.type_info().name().to_string();
                match type_name.as_str() {
                    "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(i).map(Value::Int64),
                    "REAL" => row.try_get::<f64, _>(i).map(Value::Float64),
                    "BLOB" => row.try_get::<Vec<u8>, _>(i).map(Value::Bytes),
                    _ => row.try_get::<String, _>(i).map(Value::String),
                }
                .map_err(|e| decode_err(name, e))?
            };
            out.insert(name.to_string(), value);
        }
        Ok(out)
    }

    #[cfg(feature = "mysql")]
    pub(super) fn mysql_row(row: &sqlx::mysql::MySqlRow) -> Result<Row> {
        let mut out = Row::with_capacity(row.len());
        for (i, column) in row.columns().iter().enumerate() {
            let name = column.name();
            let raw = row.try_get_raw(i).map_err(|e| decode_err(name, e))?;
            let value = if raw.is_null() {
                Value::Null
            } else {
                let type_name = column.type_info().name().to_string();
                match type_name.as_str() {
                    "BOOLEAN" => row.try_get::<bool, _>(i).map(Value::Bool),
                    "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                        row.try_get::<i64, _>(i).map(Value::Int64)
                    }
                    "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED"
                    | "INT UNSIGNED" | "BIGINT UNSIGNED" => row
                        .try_get::<u64, _>(i)
                        .map(|v| Value::Int64(v as i64)),
                    "FLOAT" => row.try_get::<f32, _>(i).map(Value::Float32),
                    "DOUBLE" => row.try_get::<f64, _>(i).map(Value::Float64),
                    "DECIMAL" => row
                        .try_get::<bigdecimal::BigDecimal, _>(i)
                        .map(|v| Value::String(v.to_string())),
                    "DATETIME" | "TIMESTAMP" => row
                        .try_get::<chrono::NaiveDateTime, _>(i)
                        .map(Value::from),
                    "DATE" => row.try_get::<chrono::NaiveDate, _>(i).map(Value::from),
                    "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
                        row.try_get::<Vec<u8>, _>(i).map(Value::Bytes)
                    }
                    _ => row.try_get::<String, _>(i).map(Value::String),
                }
                .map_err(|e| decode_err(name, e))?
            };
            out.insert(name.to_string(), value);
        }
        Ok(out)
    }

    #[cfg(feature = "postgres")]
    pub(super) fn pg_row(row: &sqlx::postgres::PgRow) -> Result<Row> {
        let mut out = Row::with_capacity(row.len());
        for (i, column) in row.columns().iter().enumerate() {
            let name = column.name();
            let raw = row.try_get_raw(i).map_err(|e| decode_err(name, e))?;
            let value = if raw.is_null() {
                Value::Null
            } else {
                let type_name = column.type_info().name().to_string();
                match type_name.as_str() {
                    "BOOL" => row.try_get::<bool, _>(i).map(Value::Bool),
                    "INT2" => row.try_get::<i16, _>(i).map(Value::Int16),
                    "INT4" => row.try_get::<i32, _>(i).map(Value::Int32),
                    "INT8" => row.try_get::<i64, _>(i).map(Value::Int64),
                    "FLOAT4" => row.try_get::<f32, _>(i).map(Value::Float32),
                    "FLOAT8" => row.try_get::<f64, _>(i).map(Value::Float64),
                    "NUMERIC" => row
                        .try_get::<bigdecimal::BigDecimal, _>(i)
                        .map(|v| Value::String(v.to_string())),
                    "TIMESTAMP" => row
                        .try_get::<chrono::NaiveDateTime, _>(i)
                        .map(Value::from),
                    "TIMESTAMPTZ" => row
                        .try_get::<chrono::DateTime<chrono::Utc>, _>(i)
                        .map(Value::from),
                    "DATE" => row.try_get::<chrono::NaiveDate, _>(i).map(Value::from),
                    "BYTEA" => row.try_get::<Vec<u8>, _>(i).map(Value::Bytes),
                    _ => row.try_get::<String, _>(i).map(Value::String),
                }
                .map_err(|e| decode_err(name, e))?
            };
            out.insert(name.to_string(), value);
        }
        Ok(out)
    }
}

/// 同步连接：在自带的 current-thread runtime 上执行 [`DbPool`] 的异步调用
#[derive(Debug)]
pub struct SqlxConnection {
    // pool 先于 runtime 释放
    pool: DbPool,
    runtime: tokio::runtime::Runtime,
}

impl SqlxConnection {
    /// 使用默认连接数连接
    pub fn connect(url: &str) -> Result<Self> {
        Self::from_config(&DbConfig::new(url))
    }

    pub fn from_config(config: &DbConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let pool = runtime.block_on(DbPool::connect(config))?;
        tracing::debug!(driver = ?pool.driver(), "connected");
        Ok(Self { pool, runtime })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn driver(&self) -> DbDriver {
        self.pool.driver()
    }
}

impl Connection for SqlxConnection {
    fn dialect(&self) -> Arc<dyn Dialect> {
        self.pool.driver().dialect()
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        tracing::debug!(sql = %sql, params = ?params, "execute");
        self.runtime.block_on(self.pool.execute(sql, params))
    }

    fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        tracing::debug!(sql = %sql, params = ?params, "fetch_all");
        self.runtime.block_on(self.pool.fetch_all(sql, params))
    }
}
