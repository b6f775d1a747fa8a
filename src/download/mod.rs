//! 下载流程模块入口。
//!
//! 子模块：
//! - `models`：错误类型、结果报告、进度事件
//! - `format`：TXT / HTML / Markdown 渲染与文件落盘
//! - `series`：系列成员的三级回退解析
//! - `progress`：进度上报与 CLI 进度条
//! - `reveal`：调用系统文件管理器打开目录
//! - `downloader`：单本 / 系列 / 批量下载编排

pub mod downloader;
pub mod format;
pub mod models;
pub mod progress;
pub mod reveal;
pub mod series;

pub use downloader::Downloader;
pub use models::{BatchReport, DownloadError, DownloadEvent, ItemOutcome};
pub use progress::ProgressReporter;
