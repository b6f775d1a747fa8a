//! 下载相关的数据模型定义。
//!
//! 包含错误类型、单本/系列/批量的结果报告，以及推送给界面的进度事件。

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::base_system::content_id::ResolveError;
use crate::network_parser::FetchError;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("series {id} ({title}) has no discoverable novel ids")]
    EmptySeries { id: String, title: String },
    #[error("input is empty")]
    EmptyInput,
    #[error("no valid content id in input")]
    NoValidIds { failures: Vec<ResolveFailure> },
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// 批量输入中无法解析的一行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveFailure {
    /// 从 1 开始，按非空行计数。
    pub line: usize,
    pub input: String,
    pub error: ResolveError,
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.error)
    }
}

/// 系列成员列表来自哪一种获取方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesMemberSource {
    Inline,
    ContentEndpoint { paginated: bool },
    Caption,
}

impl fmt::Display for SeriesMemberSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesMemberSource::Inline => f.write_str("inline"),
            SeriesMemberSource::ContentEndpoint { paginated: false } => {
                f.write_str("series_content")
            }
            SeriesMemberSource::ContentEndpoint { paginated: true } => {
                f.write_str("series_content (paginated)")
            }
            SeriesMemberSource::Caption => f.write_str("caption"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NovelReport {
    pub id: String,
    pub title: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct SeriesReport {
    pub id: String,
    pub title: String,
    pub dir: PathBuf,
    pub source: SeriesMemberSource,
    pub success: usize,
    pub total: usize,
    pub failures: Vec<ItemFailure>,
}

#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Novel(NovelReport),
    Series(SeriesReport),
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub success: usize,
    /// 成功解析的条目数；无法解析的行不计入。
    pub attempted: usize,
    pub resolve_errors: Vec<ResolveFailure>,
    pub outcomes: Vec<ItemOutcome>,
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn tally(&self) -> String {
        format!("{}/{}", self.success, self.attempted)
    }
}

/// 推送给界面回调的事件。
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    NovelStarted {
        id: String,
    },
    NovelSaved {
        id: String,
        title: String,
        path: PathBuf,
    },
    SeriesStarted {
        id: String,
    },
    SeriesResolved {
        id: String,
        title: String,
        total: usize,
        source: SeriesMemberSource,
    },
    InputRejected(ResolveFailure),
    ItemStarted {
        current: usize,
        total: usize,
        id: String,
    },
    /// 失败原因留在报告的 [`ItemFailure`] 里。
    ItemFailed {
        current: usize,
        total: usize,
        id: String,
    },
    Finished {
        success: usize,
        total: usize,
    },
}
