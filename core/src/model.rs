//! Active Record 模型
//!
//! [`ModelType`] 描述一张表（表名、主键、字段元数据、连接），构造后只读，通过 `Arc` 共享。
//! [`Model`] 是一条记录的实例，区分已持久化的 `original` 与待保存的 `changed`：
//!
//! - 新建：`original` 为空
//! - 已加载：`original` 非空，`changed` 为空
//! - 已修改：`changed` 非空
//!
//! 保存成功后调用 `set_as_saved()` 把 `changed` 合并进 `original`。

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::clause::{Paginate, TableName, Values, Where};
use crate::connection::{Connection, Row};
use crate::dialect::{Ansi, Dialect};
use crate::error::{ActiveSqlError, Result};
use crate::field::Field;
use crate::query::{Delete, Expression, Insert, Select, Statement, Update};
use crate::resultset::Resultset;
use crate::traits::Schema;
use crate::validation::{RuleSet, ValidationError};
use crate::value::{Value, ValueMap};

/// 查询标记：模型名
pub const FLAG_MODEL: &str = "model";
/// 查询标记：取值方式，`one` 表示只取一条
pub const FLAG_FETCH: &str = "fetch";

/// 模型类型描述
pub struct ModelType {
    name: String,
    table: String,
    primary_key: String,
    fields: IndexMap<String, Field>,
    connection: Option<Arc<dyn Connection>>,
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("connection", &self.connection.as_ref().map(|c| c.dialect().name()))
            .finish()
    }
}

/// [`ModelType`] 构造器
pub struct ModelTypeBuilder {
    inner: ModelType,
}

impl ModelTypeBuilder {
    /// 主键字段名，默认 `id`
    pub fn primary_key(mut self, pk: &str) -> Self {
        self.inner.primary_key = pk.to_string();
        self
    }

    pub fn field(mut self, name: &str, field: Field) -> Self {
        self.inner.fields.insert(name.to_string(), field);
        self
    }

    pub fn connection(mut self, conn: Arc<dyn Connection>) -> Self {
        self.inner.connection = Some(conn);
        self
    }

    pub fn build(self) -> Arc<ModelType> {
        Arc::new(self.inner)
    }
}

/// [`ModelType::fetch_query`] 的结果
#[derive(Debug)]
pub enum Fetched {
    One(Model),
    All(Resultset),
}

impl ModelType {
    pub fn builder(name: &str, table: &str) -> ModelTypeBuilder {
        ModelTypeBuilder {
            inner: ModelType {
                name: name.to_string(),
                table: table.to_string(),
                primary_key: "id".to_string(),
                fields: IndexMap::new(),
                connection: None,
            },
        }
    }

    /// 从 [`Schema`] 声明构造
    pub fn of<S: Schema>() -> ModelTypeBuilder {
        S::fields().into_iter().fold(
            Self::builder(S::name(), S::TABLE).primary_key(S::PK),
            |builder, (name, field)| builder.field(name, field),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &IndexMap<String, Field> {
        &self.fields
    }

    /// 绑定的连接；没有连接时返回 `NoConnection`
    pub fn connection(&self) -> Result<&Arc<dyn Connection>> {
        self.connection
            .as_ref()
            .ok_or_else(|| ActiveSqlError::NoConnection(self.name.clone()))
    }

    /// 连接的方言，没有连接时使用 ANSI
    pub fn dialect(&self) -> Arc<dyn Dialect> {
        match &self.connection {
            Some(conn) => conn.dialect(),
            None => Arc::new(Ansi),
        }
    }

    /// 创建一个新的（未持久化的）实例
    pub fn factory(self: &Arc<Self>) -> Model {
        Model::new(Arc::clone(self))
    }

    /// 查询起点：`SELECT * FROM <table>`，并标记模型名
    pub fn query(&self) -> Select {
        let mut q = Select::new();
        q.with_dialect(self.dialect())
            .select("*")
            .from(&self.table, None)
            .flag(FLAG_MODEL, &self.name);
        q
    }

    /// 按主键查找；没有找到时返回未加载的实例
    pub fn find_by_id(self: &Arc<Self>, id: impl Into<Value>) -> Result<Model> {
        let mut q = self.query();
        q.and_where(&self.primary_key, "=", id).limit(1);
        self.fetch_one(&q)
    }

    /// 执行查询：标记 `fetch = one` 时返回单个实例，否则返回结果集
    pub fn fetch_query(self: &Arc<Self>, select: &Select) -> Result<Fetched> {
        let rows = self.fetch_rows(select)?;
        if select.get_flag(FLAG_FETCH) == Some("one") {
            let model = match rows.into_iter().next() {
                Some(row) => self.hydrate(row),
                None => self.factory(),
            };
            return Ok(Fetched::One(model));
        }
        Ok(Fetched::All(Resultset::new(Arc::clone(self), rows)))
    }

    pub fn fetch_one(self: &Arc<Self>, select: &Select) -> Result<Model> {
        let mut q = select.clone();
        q.flag(FLAG_FETCH, "one");
        match self.fetch_query(&q)? {
            Fetched::One(model) => Ok(model),
            Fetched::All(rs) => Ok(rs.first().unwrap_or_else(|| self.factory())),
        }
    }

    pub fn fetch_all(self: &Arc<Self>, select: &Select) -> Result<Resultset> {
        let rows = self.fetch_rows(select)?;
        Ok(Resultset::new(Arc::clone(self), rows))
    }

    /// 计数：把查询列换成 `COUNT(<pk>) AS aggr`，去掉排序与分页
    ///
    /// 传入的查询不会被修改。
    pub fn fetch_count(&self, select: &Select) -> Result<i64> {
        let mut q = select.clone();
        q.reset_select()
            .select_expr(
                Expression::new(format!("COUNT({})", self.primary_key)),
                Some("aggr"),
            )
            .reset_order_by()
            .reset_limit()
            .reset_offset();

        let stmt = q.statement()?;
        let conn = self.connection()?;
        tracing::debug!(model = %self.name, sql = %stmt.sql, params = ?stmt.params, "count");
        let row = conn.fetch(&stmt.sql, &stmt.params)?;
        Ok(row
            .and_then(|r| r.get("aggr").and_then(Value::as_i64))
            .unwrap_or(0))
    }

    fn fetch_rows(&self, select: &Select) -> Result<Vec<Row>> {
        let stmt = select.statement()?;
        let conn = self.connection()?;
        tracing::debug!(model = %self.name, sql = %stmt.sql, params = ?stmt.params, "fetch");
        conn.fetch_all(&stmt.sql, &stmt.params)
    }

    /// 用一行数据构造已加载的实例，不经过 `on_set`
    pub(crate) fn hydrate(self: &Arc<Self>, row: Row) -> Model {
        let mut model = self.factory();
        model.set_raw(row).set_as_saved();
        model
    }
}

/// 模型实例
#[derive(Debug, Clone)]
pub struct Model {
    ty: Arc<ModelType>,
    original: ValueMap,
    changed: ValueMap,
}

impl Model {
    pub fn new(ty: Arc<ModelType>) -> Self {
        Self {
            ty,
            original: ValueMap::new(),
            changed: ValueMap::new(),
        }
    }

    /// 模型类型
    pub fn meta(&self) -> &Arc<ModelType> {
        &self.ty
    }

    // ========== 读写 ==========

    /// 写入一个值，先经过字段的 `on_set`
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let ty = Arc::clone(&self.ty);
        let mut value = value.into();
        if let Some(field) = ty.field(key) {
            value = field.apply_set(self, key, value);
        }
        self.changed.insert(key.to_string(), value);
        self
    }

    pub fn set_many<I, K, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in values {
            self.set(key.as_ref(), value);
        }
        self
    }

    /// 写入数据，不经过 `on_set`
    pub fn set_raw<I, K, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in values {
            self.changed.insert(key.into(), value.into());
        }
        self
    }

    /// 读取最新的值：`changed` 优先于 `original`，不存在时为 NULL
    pub fn get(&self, key: &str) -> Value {
        self.get_or(key, Value::Null)
    }

    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        let value = self
            .changed
            .get(key)
            .or_else(|| self.original.get(key))
            .cloned()
            .unwrap_or_else(|| default.into());
        match self.ty.field(key) {
            Some(field) => field.apply_get(self, key, value),
            None => value,
        }
    }

    /// 已持久化的值；非 NULL 时才经过 `on_get`
    pub fn original(&self, key: &str) -> Value {
        let value = self.original.get(key).cloned().unwrap_or_default();
        if value.is_null() {
            return value;
        }
        match self.ty.field(key) {
            Some(field) => field.apply_get(self, key, value),
            None => value,
        }
    }

    pub fn is_value_set(&self, key: &str) -> bool {
        self.changed.contains_key(key) || self.original.contains_key(key)
    }

    pub fn changes(&self) -> &ValueMap {
        &self.changed
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    /// 把 `changed` 合并进 `original` 并清空 `changed`
    pub fn set_as_saved(&mut self) -> &mut Self {
        tracing::trace!(model = %self.ty.name, fields = self.changed.len(), "set_as_saved");
        let changed = std::mem::take(&mut self.changed);
        self.original.extend(changed);
        self
    }

    /// 是否已从数据库加载（或已保存过）
    pub fn is_loaded(&self) -> bool {
        !self.original.is_empty()
    }

    // ========== 持久化 ==========

    /// 有主键时更新，否则新建
    pub fn save(&mut self) -> Result<&mut Self> {
        if self.original.contains_key(&self.ty.primary_key) {
            self.do_update()
        } else {
            self.do_create()
        }
    }

    fn do_create(&mut self) -> Result<&mut Self> {
        let ty = Arc::clone(&self.ty);
        let conn = ty.connection()?;
        let data = self.prepare_for_save(&self.changed);
        // 调用方自带主键时不回填生成的 id
        let generated_key = !data.contains_key(&ty.primary_key);

        let mut insert = Insert::new();
        insert
            .with_dialect(conn.dialect())
            .table(&ty.table)
            .values(data);
        if generated_key {
            insert.returning(&ty.primary_key);
        }
        let stmt = insert.statement()?;
        tracing::debug!(model = %ty.name, sql = %stmt.sql, params = ?stmt.params, "insert");
        let result = conn.execute(&stmt.sql, &stmt.params)?;

        self.set_as_saved();
        if let Some(id) = result.last_insert_id.filter(|_| generated_key) {
            self.original.insert(ty.primary_key.clone(), id);
        }
        Ok(self)
    }

    fn do_update(&mut self) -> Result<&mut Self> {
        if self.changed.is_empty() {
            return Ok(self);
        }
        let ty = Arc::clone(&self.ty);
        let conn = ty.connection()?;
        let id = self.primary_key_value()?;
        let data = self.prepare_for_save(&self.changed);

        let mut update = Update::new();
        update
            .with_dialect(conn.dialect())
            .table(&ty.table)
            .values(data)
            .and_where(&ty.primary_key, "=", id);
        let stmt = update.statement()?;
        self.run(conn.as_ref(), &stmt, "update")?;

        self.set_as_saved();
        Ok(self)
    }

    /// 删除记录；未加载的实例直接返回
    pub fn delete(&mut self) -> Result<&mut Self> {
        if !self.is_loaded() {
            return Ok(self);
        }
        let ty = Arc::clone(&self.ty);
        let conn = ty.connection()?;
        let id = self.primary_key_value()?;

        let mut delete = Delete::new();
        delete
            .with_dialect(conn.dialect())
            .table(&ty.table)
            .and_where(&ty.primary_key, "=", id);
        let stmt = delete.statement()?;
        self.run(conn.as_ref(), &stmt, "delete")?;
        Ok(self)
    }

    fn run(&self, conn: &dyn Connection, stmt: &Statement, op: &str) -> Result<()> {
        tracing::debug!(model = %self.ty.name, sql = %stmt.sql, params = ?stmt.params, "{}", op);
        let result = conn.execute(&stmt.sql, &stmt.params)?;
        if result.rows_affected == 0 {
            tracing::warn!(
                model = %self.ty.name,
                table = %self.ty.table,
                "{} affected no rows",
                op
            );
        }
        Ok(())
    }

    fn primary_key_value(&self) -> Result<Value> {
        self.original
            .get(&self.ty.primary_key)
            .cloned()
            .ok_or_else(|| ActiveSqlError::MissingPrimaryKey(self.ty.primary_key.clone()))
    }

    /// 每个字段经过 `on_save`
    fn prepare_for_save(&self, input: &ValueMap) -> ValueMap {
        input
            .iter()
            .map(|(key, value)| {
                let value = match self.ty.field(key) {
                    Some(field) => field.apply_save(self, key, value.clone()),
                    None => value.clone(),
                };
                (key.clone(), value)
            })
            .collect()
    }

    // ========== 校验 ==========

    /// 校验当前数据（`original` 与 `changed` 合并，`changed` 优先）
    ///
    /// 先执行字段上的规则，再执行 `extra` 中的规则；所有失败信息汇总后一起返回。
    /// 不修改实例。
    pub fn validate(&self, extra: &RuleSet) -> Result<()> {
        let mut merged = self.original.clone();
        for (key, value) in &self.changed {
            merged.insert(key.clone(), value.clone());
        }
        let data = self.prepare_for_save(&merged);

        let mut errors = ValidationError::new();
        for (name, field) in self.ty.fields() {
            errors.collect(name, field.rules(), &data);
        }
        for (name, rules) in extra.iter() {
            errors.collect(name, rules, &data);
        }
        errors.into_result().map_err(ActiveSqlError::from)
    }
}
