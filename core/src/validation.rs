//! 字段校验
//!
//! 规则挂在字段上（见 [`Field`](crate::field::Field)），也可以在调用
//! [`Model::validate`](crate::model::Model::validate) 时通过 [`RuleSet`] 临时追加。
//! 所有规则都会执行，失败信息按字段汇总到 [`ValidationError`]。

use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::error::{ActiveSqlError, Result};
use crate::value::{Value, ValueMap};

/// 自定义规则的检查函数：`(当前值, 全部数据) -> 是否通过`
pub type CheckFn = Arc<dyn Fn(&Value, &ValueMap) -> bool + Send + Sync>;

/// 校验规则
#[derive(Clone)]
pub enum Rule {
    /// 值存在且不是 NULL、空白字符串
    Required,
    /// 字符数下限
    LengthMin(usize),
    /// 字符数上限
    LengthMax(usize),
    Min(f64),
    Max(f64),
    Email,
    Regex(Regex),
    /// 值必须在列表中
    In(Vec<Value>),
    /// 与另一个字段的值相同
    Equals(String),
    Integer,
    Numeric,
    Custom {
        name: String,
        message: String,
        check: CheckFn,
    },
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::LengthMin(n) | Rule::LengthMax(n) => write!(f, "{}({})", self.name(), n),
            Rule::Min(n) | Rule::Max(n) => write!(f, "{}({})", self.name(), n),
            Rule::Regex(re) => write!(f, "regex({})", re.as_str()),
            Rule::In(list) => write!(f, "in({:?})", list),
            Rule::Equals(other) => write!(f, "equals({})", other),
            Rule::Custom { name, .. } => write!(f, "custom({})", name),
            _ => f.write_str(self.name()),
        }
    }
}

impl Rule {
    /// 从 `{ruleName, args...}` 形式的描述构造规则
    ///
    /// ```rust,ignore
    /// Rule::from_descriptor("lengthMin", &[Value::from(8)])?;
    /// Rule::from_descriptor("in", &["admin".into(), "editor".into()])?;
    /// ```
    pub fn from_descriptor(name: &str, args: &[Value]) -> Result<Self> {
        let invalid = |reason: &str| ActiveSqlError::InvalidRule {
            rule: name.to_string(),
            reason: reason.to_string(),
        };
        let first = || args.first().filter(|v| !v.is_null());

        let rule = match name {
            "required" => Rule::Required,
            "email" => Rule::Email,
            "integer" => Rule::Integer,
            "numeric" => Rule::Numeric,
            "lengthMin" | "lengthMax" => {
                let n = first()
                    .and_then(Value::as_i64)
                    .filter(|n| *n >= 0)
                    .ok_or_else(|| invalid("expected a non-negative length"))?
                    as usize;
                if name == "lengthMin" {
                    Rule::LengthMin(n)
                } else {
                    Rule::LengthMax(n)
                }
            }
            "min" | "max" => {
                let n = first()
                    .and_then(Value::as_f64)
                    .ok_or_else(|| invalid("expected a number"))?;
                if name == "min" {
                    Rule::Min(n)
                } else {
                    Rule::Max(n)
                }
            }
            "regex" => {
                let pattern = first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("expected a pattern"))?;
                let re = Regex::new(pattern).map_err(|e| invalid(&e.to_string()))?;
                Rule::Regex(re)
            }
            "in" => {
                if args.is_empty() {
                    return Err(invalid("expected at least one allowed value"));
                }
                Rule::In(args.to_vec())
            }
            "equals" => {
                let other = first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("expected a field name"))?;
                Rule::Equals(other.to_string())
            }
            _ => return Err(ActiveSqlError::UnknownRule(name.to_string())),
        };
        Ok(rule)
    }

    pub fn custom<F>(name: &str, message: &str, check: F) -> Self
    where
        F: Fn(&Value, &ValueMap) -> bool + Send + Sync + 'static,
    {
        Rule::Custom {
            name: name.to_string(),
            message: message.to_string(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Rule::Required => "required",
            Rule::LengthMin(_) => "lengthMin",
            Rule::LengthMax(_) => "lengthMax",
            Rule::Min(_) => "min",
            Rule::Max(_) => "max",
            Rule::Email => "email",
            Rule::Regex(_) => "regex",
            Rule::In(_) => "in",
            Rule::Equals(_) => "equals",
            Rule::Integer => "integer",
            Rule::Numeric => "numeric",
            Rule::Custom { name, .. } => name,
        }
    }

    /// 检查 `data` 中的 `field`，失败时返回提示信息
    pub fn check(&self, field: &str, data: &ValueMap) -> Option<String> {
        let value = data.get(field).unwrap_or(&Value::Null);

        if let Rule::Required = self {
            return value.is_empty().then(|| format!("{} is required", label(field)));
        }
        // 其它规则只检查有值的字段
        if value.is_null() {
            return None;
        }

        let passed = match self {
            Rule::Required => true,
            Rule::LengthMin(n) => value.char_len().is_some_and(|len| len >= *n),
            Rule::LengthMax(n) => value.char_len().is_some_and(|len| len <= *n),
            Rule::Min(n) => value.as_f64().is_some_and(|v| v >= *n),
            Rule::Max(n) => value.as_f64().is_some_and(|v| v <= *n),
            Rule::Email => value.as_str().is_some_and(is_email),
            Rule::Regex(re) => value.as_str().is_some_and(|s| re.is_match(s)),
            Rule::In(list) => list.iter().any(|allowed| loosely_equal(allowed, value)),
            Rule::Equals(other) => data
                .get(other)
                .is_some_and(|other| loosely_equal(other, value)),
            Rule::Integer => match value {
                Value::Int64(_) | Value::Int32(_) | Value::Int16(_) => true,
                Value::String(s) => s.trim().parse::<i64>().is_ok(),
                _ => false,
            },
            Rule::Numeric => match value {
                Value::Bool(_) | Value::Bytes(_) => false,
                other => other.as_f64().is_some(),
            },
            Rule::Custom { check, .. } => check(value, data),
        };

        if passed {
            None
        } else {
            Some(self.message(field))
        }
    }

    fn message(&self, field: &str) -> String {
        let label = label(field);
        match self {
            Rule::Required => format!("{} is required", label),
            Rule::LengthMin(n) => format!("{} must be at least {} characters long", label, n),
            Rule::LengthMax(n) => format!("{} must not exceed {} characters", label, n),
            Rule::Min(n) => format!("{} must be at least {}", label, n),
            Rule::Max(n) => format!("{} must be no more than {}", label, n),
            Rule::Email => format!("{} is not a valid email address", label),
            Rule::Regex(_) => format!("{} contains invalid characters", label),
            Rule::In(_) => format!("{} contains invalid value", label),
            Rule::Equals(other) => format!("{} must be the same as '{}'", label, other),
            Rule::Integer => format!("{} must be an integer", label),
            Rule::Numeric => format!("{} must be numeric", label),
            Rule::Custom { message, .. } => format!("{} {}", label, message),
        }
    }
}

/// `password_repeat` -> `Password repeat`
fn label(field: &str) -> String {
    let text = field.replace('_', " ");
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => text,
    }
}

fn is_email(s: &str) -> bool {
    static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

/// 数值按数值比较（`Int32(1)` 等于 `Int64(1)`），其它按文本比较
fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::String(_), _) | (_, Value::String(_)) => a.to_string() == b.to_string(),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

/// 临时追加的规则：字段 -> 规则列表
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: IndexMap<String, Vec<Rule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, field: &str, rule: Rule) -> Self {
        self.add(field, rule);
        self
    }

    /// 以描述形式追加规则，例如 `("password", "lengthMin", [8])`
    pub fn descriptor(mut self, field: &str, name: &str, args: &[Value]) -> Result<Self> {
        self.add(field, Rule::from_descriptor(name, args)?);
        Ok(self)
    }

    pub fn add(&mut self, field: &str, rule: Rule) -> &mut Self {
        self.rules.entry(field.to_string()).or_default().push(rule);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Rule])> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 对数据执行全部规则
    pub fn check(&self, data: &ValueMap) -> std::result::Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        for (field, rules) in self.iter() {
            errors.collect(field, rules, data);
        }
        errors.into_result()
    }
}

/// 校验失败，字段 -> 失败信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub messages: IndexMap<String, Vec<String>>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .messages
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "Validation failed for {}", fields)
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.messages
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// 执行一个字段的规则并记录失败信息
    pub fn collect(&mut self, field: &str, rules: &[Rule], data: &ValueMap) {
        for rule in rules {
            if let Some(message) = rule.check(field, data) {
                self.add(field, message);
            }
        }
    }

    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.messages.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }

    pub fn into_result(self) -> std::result::Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}
