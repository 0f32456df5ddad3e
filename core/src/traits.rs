use crate::field::Field;

/// Schema trait 定义了模型的基本元数据
///
/// 用一个空类型声明表结构，然后通过 [`ModelType::of`](crate::model::ModelType::of)
/// 构造共享的模型类型：
///
/// ```rust,ignore
/// struct User;
///
/// impl Schema for User {
///     const TABLE: &'static str = "users";
///
///     fn fields() -> Vec<(&'static str, Field)> {
///         vec![("name", Field::new().rule(Rule::Required))]
///     }
/// }
///
/// let users = ModelType::of::<User>().connection(conn).build();
/// ```
pub trait Schema {
    /// 表名
    const TABLE: &'static str;
    /// 主键字段名
    const PK: &'static str = "id";

    /// 模型名称，默认取类型名最后一段
    fn name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// 字段元数据，按声明顺序
    fn fields() -> Vec<(&'static str, Field)> {
        Vec::new()
    }
}
