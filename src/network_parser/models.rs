//! 接口解析结果。

use std::collections::HashSet;

use serde_json::Value;

use crate::base_system::content_id::is_digit_id;

pub const DEFAULT_NOVEL_TITLE: &str = "未命名小说";
pub const DEFAULT_SERIES_TITLE: &str = "未命名系列";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NovelRecord {
    pub id: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesDetail {
    pub id: String,
    pub title: String,
    pub caption: String,
    /// `seriesContents.contents` 中内嵌的成员 ID（可能为空或不完整）。
    pub inline_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesContentPage {
    pub total: Option<usize>,
    pub ids: Vec<String>,
    /// 本页条目数（含无法解析出 ID 的条目），用于推进 offset。
    pub item_count: usize,
}

/// 有序、去重的成员 ID 列表。非数字、全零或重复的 ID 会被忽略。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesMemberList {
    ids: Vec<String>,
    seen: HashSet<String>,
}

impl SeriesMemberList {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回是否真正插入。
    pub fn push(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if !is_positive_id(&id) || self.seen.contains(&id) {
            return false;
        }
        self.seen.insert(id.clone());
        self.ids.push(id);
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }

    pub fn into_vec(self) -> Vec<String> {
        self.ids
    }
}

impl<S: Into<String>> Extend<S> for SeriesMemberList {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for id in iter {
            self.push(id);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for SeriesMemberList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

pub(crate) fn is_positive_id(id: &str) -> bool {
    is_digit_id(id) && id.chars().any(|c| c != '0')
}

/// 条目的 `id` 字段，兼容字符串与数字两种形态。
pub(crate) fn item_id(item: &Value) -> Option<String> {
    let id = match item.get("id")? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    is_positive_id(&id).then_some(id)
}

pub(crate) fn ids_from_items(items: Option<&Value>) -> (Vec<String>, usize) {
    let Some(arr) = items.and_then(Value::as_array) else {
        return (Vec::new(), 0);
    };
    (arr.iter().filter_map(item_id).collect(), arr.len())
}

/// JSON 真值判断：null/false/0/空串/空数组/空对象 为假。
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

pub(crate) fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn usize_field(value: &Value, key: &str) -> Option<usize> {
    match value.get(key)? {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
