//! 全局偏好设置（Config）与默认值。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息。

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigSpec, FieldMeta};
use super::history::DownloadHistory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Html,
    #[serde(alias = "md")]
    Markdown,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [
        OutputFormat::Txt,
        OutputFormat::Html,
        OutputFormat::Markdown,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::Txt => "TXT",
            OutputFormat::Html => "HTML",
            OutputFormat::Markdown => "Markdown",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(OutputFormat::Txt),
            "html" | "htm" => Ok(OutputFormat::Html),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown format: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 保存配置
    #[serde(default = "default_save_path")]
    pub save_path: String,
    #[serde(default)]
    pub file_format: OutputFormat,
    #[serde(default = "default_true")]
    pub open_after_download: bool,

    // 界面配置
    #[serde(default = "default_language")]
    pub language: String,

    // 系列配置
    #[serde(default)]
    pub paginate_series_content: bool,

    // 网络配置
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub request_timeout: u64,

    // 下载记录
    #[serde(default)]
    pub download_history: DownloadHistory,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_path: default_save_path(),
            file_format: OutputFormat::default(),
            open_after_download: default_true(),
            language: default_language(),
            paginate_series_content: false,
            base_url: default_base_url(),
            request_timeout: 0,
            download_history: DownloadHistory::default(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 8] = [
            FieldMeta {
                name: "save_path",
                description: "保存路径",
            },
            FieldMeta {
                name: "file_format",
                description: "保存小说格式, 可选: [txt, html, markdown]",
            },
            FieldMeta {
                name: "open_after_download",
                description: "下载完成后打开所在文件夹",
            },
            FieldMeta {
                name: "language",
                description: "界面语言, 可选: [zh_cn, en_us]（修改后程序会重启）",
            },
            FieldMeta {
                name: "paginate_series_content",
                description: "系列内容接口使用分页完整拉取（否则优先使用系列详情内嵌列表）",
            },
            FieldMeta {
                name: "base_url",
                description: "站点地址",
            },
            FieldMeta {
                name: "request_timeout",
                description: "请求超时时间（秒）, 0 表示使用 HTTP 客户端默认值",
            },
            FieldMeta {
                name: "download_history",
                description: "下载记录（最多保留 20 条, 最新的在最前）",
            },
        ];
        &FIELDS
    }

    fn normalize(&mut self) {
        self.download_history.enforce_cap();
        let trimmed = self.base_url.trim().trim_end_matches('/');
        self.base_url = if trimmed.is_empty() {
            default_base_url()
        } else {
            trimmed.to_string()
        };
    }
}

impl Config {
    pub fn default_save_dir(&self) -> PathBuf {
        if self.save_path.trim().is_empty() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else {
            PathBuf::from(self.save_path.trim())
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout > 0).then(|| Duration::from_secs(self.request_timeout))
    }
}

fn default_true() -> bool {
    true
}

fn default_save_path() -> String {
    "downloads".to_string()
}

fn default_language() -> String {
    "zh_cn".to_string()
}

fn default_base_url() -> String {
    "https://www.pixiv.net".to_string()
}
