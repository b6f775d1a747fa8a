use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::models::{
    DEFAULT_NOVEL_TITLE, DEFAULT_SERIES_TITLE, NovelRecord, SeriesContentPage, SeriesDetail,
    SeriesMemberList, ids_from_items, is_truthy, string_field, usize_field,
};
use super::transport::{HttpReply, ReqwestTransport, Transport};
use super::FetchError;
use crate::base_system::context::Config;

pub const SERIES_PAGE_LIMIT: usize = 100;
const LOG_BODY_CHARS: usize = 1000;

/// 三个 AJAX 接口的客户端：小说详情、系列详情、系列内容（可分页）。
pub struct AjaxClient<T = ReqwestTransport> {
    transport: T,
    base_url: String,
}

impl AjaxClient<ReqwestTransport> {
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let base = config.base_url.trim_end_matches('/');
        let transport = ReqwestTransport::new(&format!("{base}/"), config.request_timeout())?;
        Ok(Self::with_transport(transport, base))
    }
}

impl<T: Transport> AjaxClient<T> {
    pub fn with_transport(transport: T, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn novel_url(&self, id: &str) -> String {
        format!("{}/ajax/novel/{id}", self.base_url)
    }

    fn series_url(&self, id: &str) -> String {
        format!("{}/ajax/novel/series/{id}", self.base_url)
    }

    fn series_content_url(&self, id: &str) -> String {
        format!("{}/ajax/novel/series_content/{id}", self.base_url)
    }

    pub fn fetch_novel(&self, id: &str) -> Result<NovelRecord, FetchError> {
        let url = self.novel_url(id);
        debug!("请求小说API: {}", url);
        let reply = self.transport.get(&url, &[])?;
        if reply.status == 404 {
            error!("小说 {} 不存在", id);
            return Err(FetchError::NotFound { id: id.to_string() });
        }
        let body = read_envelope(&url, reply)?;

        let title = string_field(&body, "title").unwrap_or_else(|| DEFAULT_NOVEL_TITLE.to_string());
        let content = body
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        info!(
            "获取小说成功: 《{}》, 内容长度: {} 字符",
            title,
            content.chars().count()
        );

        Ok(NovelRecord {
            id: id.to_string(),
            title,
            content,
        })
    }

    pub fn fetch_series(&self, id: &str) -> Result<SeriesDetail, FetchError> {
        let url = self.series_url(id);
        debug!("请求系列API: {}", url);
        let reply = self.transport.get(&url, &[])?;
        if reply.status == 404 {
            error!("系列 {} 不存在", id);
            return Err(FetchError::SeriesNotFound { id: id.to_string() });
        }
        let body = read_envelope(&url, reply)?;

        let title =
            string_field(&body, "title").unwrap_or_else(|| DEFAULT_SERIES_TITLE.to_string());
        let caption = body
            .get("caption")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let (inline_ids, _) = ids_from_items(
            body.get("seriesContents")
                .and_then(|v| v.get("contents")),
        );
        info!("获取系列成功: 《{}》, 内嵌条目 {} 个", title, inline_ids.len());

        Ok(SeriesDetail {
            id: id.to_string(),
            title,
            caption,
            inline_ids,
        })
    }

    /// 系列内容接口，不带分页参数请求一次。
    pub fn fetch_series_content(&self, id: &str) -> Result<SeriesContentPage, FetchError> {
        self.series_content_request(id, &[])
    }

    pub fn fetch_series_content_page(
        &self,
        id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<SeriesContentPage, FetchError> {
        let query = [
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("order", "asc".to_string()),
        ];
        self.series_content_request(id, &query)
    }

    /// 分页拉取全部系列成员。
    ///
    /// 首页给出 `total`；每页后 `offset += 本页条目数`，本页为空或 `offset >= total` 时结束。
    /// 首页失败返回错误，后续页失败则结束循环并返回已取得的部分。
    pub fn collect_series_content(&self, id: &str) -> Result<Vec<String>, FetchError> {
        let mut members = SeriesMemberList::new();
        let mut offset = 0usize;
        let mut total: Option<usize> = None;

        loop {
            let page = match self.fetch_series_content_page(id, SERIES_PAGE_LIMIT, offset) {
                Ok(page) => page,
                Err(err) if total.is_some() => {
                    warn!("系列 {} 第 offset={} 页获取失败，停止分页: {}", id, offset, err);
                    break;
                }
                Err(err) => return Err(err),
            };

            let total_items = *total.get_or_insert_with(|| {
                let t = page.total.unwrap_or(0);
                info!("系列 {} 总项目数: {}", id, t);
                t
            });

            members.extend(page.ids);
            offset += page.item_count;

            if page.item_count == 0 || offset >= total_items {
                break;
            }
        }

        info!("系列 {} 分页获取到 {} 个小说ID", id, members.len());
        Ok(members.into_vec())
    }

    fn series_content_request(
        &self,
        id: &str,
        query: &[(&str, String)],
    ) -> Result<SeriesContentPage, FetchError> {
        let url = self.series_content_url(id);
        debug!("请求系列内容API: {} {:?}", url, query);
        let reply = self.transport.get(&url, query)?;
        if reply.status == 404 {
            return Err(FetchError::SeriesNotFound { id: id.to_string() });
        }
        let body = read_envelope(&url, reply)?;

        let (ids, item_count) = ids_from_items(
            body.get("page")
                .and_then(|p| p.get("seriesContents")),
        );
        Ok(SeriesContentPage {
            total: usize_field(&body, "total"),
            ids,
            item_count,
        })
    }
}

/// 校验状态码并拆开 `{error, message, body}` 外壳，返回 body。
fn read_envelope(url: &str, reply: HttpReply) -> Result<Value, FetchError> {
    debug!("API响应状态码: {}", reply.status);
    if !reply.is_success() {
        error!("请求失败: {} -> HTTP {}", url, reply.status);
        return Err(FetchError::Status {
            url: url.to_string(),
            status: reply.status,
        });
    }

    let data: Value = serde_json::from_str(&reply.body).map_err(|err| {
        error!("响应不是有效的 JSON: {} ({})", url, err);
        FetchError::MalformedResponse {
            url: url.to_string(),
            detail: format!("invalid json: {err}"),
        }
    })?;
    debug!("API响应: {}", truncate_chars(&reply.body, LOG_BODY_CHARS));

    if let Some(flag) = data.get("error")
        && is_truthy(flag)
    {
        let message = string_field(&data, "message")
            .or_else(|| string_field(flag, "message"))
            .unwrap_or_default();
        error!("API返回错误: {}", message);
        return Err(FetchError::ApiError { message });
    }

    match data.get("body") {
        Some(body) if is_truthy(body) => Ok(body.clone()),
        _ => {
            error!("响应缺少 body: {}", url);
            Err(FetchError::MalformedResponse {
                url: url.to_string(),
                detail: "missing body".to_string(),
            })
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
