//! 查询结果集
//!
//! 保存原始行数据，访问时才构造模型实例。

use std::sync::Arc;

use crate::connection::Row;
use crate::model::{Model, ModelType};

#[derive(Debug, Clone)]
pub struct Resultset {
    ty: Arc<ModelType>,
    rows: Vec<Row>,
}

impl Resultset {
    pub fn new(ty: Arc<ModelType>, rows: Vec<Row>) -> Self {
        Self { ty, rows }
    }

    pub fn model_type(&self) -> &Arc<ModelType> {
        &self.ty
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 第 `index` 行对应的已加载实例
    pub fn get(&self, index: usize) -> Option<Model> {
        self.rows.get(index).map(|row| self.ty.hydrate(row.clone()))
    }

    pub fn first(&self) -> Option<Model> {
        self.get(0)
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            ty: &self.ty,
            rows: self.rows.iter(),
        }
    }

    /// 原始行数据
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

pub struct Iter<'a> {
    ty: &'a Arc<ModelType>,
    rows: std::slice::Iter<'a, Row>,
}

impl Iterator for Iter<'_> {
    type Item = Model;

    fn next(&mut self) -> Option<Model> {
        self.rows.next().map(|row| self.ty.hydrate(row.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

pub struct IntoIter {
    ty: Arc<ModelType>,
    rows: std::vec::IntoIter<Row>,
}

impl Iterator for IntoIter {
    type Item = Model;

    fn next(&mut self) -> Option<Model> {
        self.rows.next().map(|row| self.ty.hydrate(row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for IntoIter {}

impl IntoIterator for Resultset {
    type Item = Model;
    type IntoIter = IntoIter;

    fn into_iter(self) -> IntoIter {
        IntoIter {
            ty: self.ty,
            rows: self.rows.into_iter(),
        }
    }
}

impl<'a> IntoIterator for &'a Resultset {
    type Item = Model;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}
