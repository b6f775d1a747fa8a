//! 站点 AJAX 接口访问。
//!
//! 子模块：
//! - `transport`：`Transport` 抽象与 blocking reqwest 实现
//! - `models`：小说 / 系列 / 系列内容分页的解析结果
//! - `client`：三个接口的请求、响应外壳（error/message/body）解析、分页拉取

pub mod client;
pub mod models;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

pub use client::AjaxClient;
pub use models::{NovelRecord, SeriesDetail, SeriesMemberList};
#[cfg(test)]
pub(crate) use transport::HttpReply;
pub use transport::{ReqwestTransport, Transport};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("novel {id} not found")]
    NotFound { id: String },
    #[error("series {id} not found")]
    SeriesNotFound { id: String },
    #[error("malformed response from {url}: {detail}")]
    MalformedResponse { url: String, detail: String },
    #[error("api error: {message}")]
    ApiError { message: String },
    #[error("unexpected http status {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
