//! 字段元数据
//!
//! 每个模型类型持有一份字段表：字段名 -> [`Field`]。字段可以挂三个钩子和一组校验规则：
//!
//! - `on_set`：`Model::set` 写入前转换值
//! - `on_get`：`Model::get` / `Model::original` 读取时转换值
//! - `on_save`：保存或校验前转换值
//!
//! 没有登记的字段按原值读写。

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::model::Model;
use crate::validation::Rule;
use crate::value::Value;

/// 字段钩子：`(模型, 字段名, 值) -> 新值`
pub type Hook = Arc<dyn Fn(&Model, &str, Value) -> Value + Send + Sync>;

#[derive(Clone, Default)]
pub struct Field {
    on_set: Option<Hook>,
    on_get: Option<Hook>,
    on_save: Option<Hook>,
    rules: Vec<Rule>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("on_set", &self.on_set.is_some())
            .field("on_get", &self.on_get.is_some())
            .field("on_save", &self.on_save.is_some())
            .field("rules", &self.rules)
            .finish()
    }
}

impl Field {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_set<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model, &str, Value) -> Value + Send + Sync + 'static,
    {
        self.on_set = Some(Arc::new(hook));
        self
    }

    pub fn on_get<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model, &str, Value) -> Value + Send + Sync + 'static,
    {
        self.on_get = Some(Arc::new(hook));
        self
    }

    pub fn on_save<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Model, &str, Value) -> Value + Send + Sync + 'static,
    {
        self.on_save = Some(Arc::new(hook));
        self
    }

    /// 追加一条规则，按追加顺序执行
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// 以 `{ruleName, args...}` 描述追加规则
    pub fn validate_with(mut self, name: &str, args: &[Value]) -> Result<Self> {
        self.rules.push(Rule::from_descriptor(name, args)?);
        Ok(self)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub(crate) fn apply_set(&self, model: &Model, key: &str, value: Value) -> Value {
        apply(&self.on_set, model, key, value)
    }

    pub(crate) fn apply_get(&self, model: &Model, key: &str, value: Value) -> Value {
        apply(&self.on_get, model, key, value)
    }

    pub(crate) fn apply_save(&self, model: &Model, key: &str, value: Value) -> Value {
        apply(&self.on_save, model, key, value)
    }
}

fn apply(hook: &Option<Hook>, model: &Model, key: &str, value: Value) -> Value {
    match hook {
        Some(f) => f(model, key, value),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelType;

    #[test]
    fn test_hooks_default_to_identity() {
        let ty = ModelType::builder("User", "users").build();
        let model = ty.factory();
        let field = Field::new();
        assert_eq!(field.apply_set(&model, "name", Value::from("x")), Value::from("x"));
        assert_eq!(field.apply_get(&model, "name", Value::Null), Value::Null);
        assert_eq!(field.apply_save(&model, "name", Value::from(1)), Value::from(1));
    }

    #[test]
    fn test_hooks_receive_key() {
        let ty = ModelType::builder("User", "users").build();
        let model = ty.factory();
        let field = Field::new().on_save(|_, key, v| Value::from(format!("{}={}", key, v)));
        assert_eq!(
            field.apply_save(&model, "name", Value::from("Alex")),
            Value::from("name=Alex")
        );
    }

    #[test]
    fn test_rules_keep_order() {
        let field = Field::new()
            .rule(Rule::Required)
            .validate_with("lengthMin", &[Value::from(3)])
            .unwrap();
        let names: Vec<&str> = field.rules().iter().map(Rule::name).collect();
        assert_eq!(names, vec!["required", "lengthMin"]);
        assert!(Field::new().validate_with("nope", &[]).is_err());
    }

    #[test]
    fn test_debug_hides_closures() {
        let field = Field::new().on_get(|_, _, v| v);
        let dbg = format!("{:?}", field);
        assert!(dbg.contains("on_get: true"));
        assert!(dbg.contains("on_set: false"));
    }
}
