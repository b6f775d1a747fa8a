//! 作品 ID/链接解析：把用户输入规范化为 `ContentReference`。

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// 按优先级排列的输入形态，第一个命中的模式决定结果。
const PATTERNS: [&str; 8] = [
    r"novel/show\.php\?id=(\d+)", // 旧版链接
    r"novel/.*?id=(\d+)",         // 带参数的链接
    r"novel/(\d+)",               // 新版链接
    r"n/(\d+)",                   // 短链接
    r"series/(\d+)",              // 系列链接
    r"works/(\d+)",               // 作品链接
    r"id=(\d+)",                  // 直接 id 参数
    r"^(\d+)$",                   // 纯数字
];

static COMPILED: OnceLock<Vec<(Regex, ContentKind)>> = OnceLock::new();

fn compiled() -> &'static [(Regex, ContentKind)] {
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .map(|src| {
                let kind = if src.contains("series") {
                    ContentKind::Series
                } else {
                    ContentKind::Novel
                };
                (Regex::new(src).expect("compile content id pattern"), kind)
            })
            .collect()
    })
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unrecognized input: '{input}'")]
    UnrecognizedInput { input: String },
    #[error("invalid id: '{id}'")]
    InvalidId { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Novel,
    Series,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Novel => "novel",
            ContentKind::Series => "series",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已解析的 (类型, 数字 ID)。只能通过解析或校验构造。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentReference {
    kind: ContentKind,
    id: String,
}

impl ContentReference {
    pub fn new(kind: ContentKind, id: impl Into<String>) -> Result<Self, ResolveError> {
        let id = id.into();
        validate_id(&id)?;
        Ok(Self { kind, id })
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ContentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

pub fn is_digit_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

pub fn validate_id(id: &str) -> Result<(), ResolveError> {
    if is_digit_id(id) {
        Ok(())
    } else {
        Err(ResolveError::InvalidId { id: id.to_string() })
    }
}

pub fn resolve_content_id(input: &str) -> Result<ContentReference, ResolveError> {
    let trimmed = input.trim();

    for (re, kind) in compiled() {
        if let Some(caps) = re.captures(trimmed)
            && let Some(m) = caps.get(1)
        {
            return ContentReference::new(*kind, m.as_str());
        }
    }

    Err(ResolveError::UnrecognizedInput {
        input: trimmed.to_string(),
    })
}
