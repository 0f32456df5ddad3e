use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum ActiveSqlError {
    #[error("Unsupported database URL: {0}")]
    UnsupportedDatabase(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("No connection pool available for driver")]
    NoPoolAvailable,
    /// 同步适配器内部的 tokio runtime 创建失败
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
    /// 行数据无法解码为 Value
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Configuration error: {0}")]
    Config(String),

    // ========== 构建期错误 ==========
    #[error("Unknown join type: {0}")]
    InvalidJoinType(String),
    #[error("Table '{0}' is already part of the query, an alias is required")]
    MissingAlias(String),
    #[error("Unknown validation rule: {0}")]
    UnknownRule(String),
    #[error("Invalid arguments for rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    // ========== 渲染 / 执行契约 ==========
    /// 查询没有设置表名，无法生成语句
    #[error("Query has no table")]
    MissingTable,
    /// INSERT 或 UPDATE 没有任何值
    #[error("Statement has no values")]
    MissingValues,
    /// 模型类型没有绑定连接，无法渲染或执行
    #[error("Model type '{0}' has no connection")]
    NoConnection(String),
    #[error("Primary key '{0}' is not loaded")]
    MissingPrimaryKey(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, ActiveSqlError>;
