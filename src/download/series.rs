//! 系列成员解析：依次尝试 内嵌列表 → 系列内容接口 → 简介中的数字 ID。

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

use super::models::SeriesMemberSource;
use crate::network_parser::{AjaxClient, SeriesDetail, SeriesMemberList, Transport};

static RE_CAPTION_ID: OnceLock<Regex> = OnceLock::new();

fn re_caption_id() -> &'static Regex {
    RE_CAPTION_ID.get_or_init(|| Regex::new(r"\b[0-9]{7,9}\b").expect("compile RE_CAPTION_ID"))
}

/// 简介文本中所有 7~9 位的独立数字串。
pub fn caption_ids(caption: &str) -> Vec<String> {
    re_caption_id()
        .find_iter(caption)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// 返回第一个非空的成员列表及其来源；全部为空时返回 `None`。
///
/// 内嵌列表可能不完整，`paginate` 为真时第二种方式改用分页接口完整拉取。
pub fn resolve_members<T: Transport>(
    client: &AjaxClient<T>,
    detail: &SeriesDetail,
    paginate: bool,
) -> Option<(SeriesMemberList, SeriesMemberSource)> {
    let inline: SeriesMemberList = detail.inline_ids.iter().cloned().collect();
    if !inline.is_empty() {
        debug!("系列 {} 使用内嵌列表: {} 个", detail.id, inline.len());
        return Some((inline, SeriesMemberSource::Inline));
    }

    info!("系列 {} 详情未返回内容，尝试系列内容API", detail.id);
    let from_endpoint = if paginate {
        client.collect_series_content(&detail.id)
    } else {
        client.fetch_series_content(&detail.id).map(|page| page.ids)
    };
    match from_endpoint {
        Ok(ids) => {
            let list: SeriesMemberList = ids.into_iter().collect();
            if !list.is_empty() {
                return Some((
                    list,
                    SeriesMemberSource::ContentEndpoint {
                        paginated: paginate,
                    },
                ));
            }
        }
        Err(err) => warn!("获取系列内容失败: {}", err),
    }

    info!("系列 {} 尝试从简介中提取小说ID", detail.id);
    let from_caption: SeriesMemberList = caption_ids(&detail.caption).into_iter().collect();
    if !from_caption.is_empty() {
        return Some((from_caption, SeriesMemberSource::Caption));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network_parser::testing::ScriptedTransport;
    use crate::network_parser::HttpReply;
    use serde_json::json;

    fn detail(inline: &[&str], caption: &str) -> SeriesDetail {
        SeriesDetail {
            id: "77".into(),
            title: "S".into(),
            caption: caption.into(),
            inline_ids: inline.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn client(t: ScriptedTransport) -> AjaxClient<ScriptedTransport> {
        AjaxClient::with_transport(t, "https://pixiv.test")
    }

    fn content_page(ids: &[&str]) -> serde_json::Value {
        let items: Vec<_> = ids.iter().map(|id| json!({"id": id})).collect();
        json!({"error": false, "body": {"total": ids.len(), "page": {"seriesContents": items}}})
    }

    #[test]
    fn caption_scan_finds_seven_to_nine_digits() {
        let caption = "前作 1234567 と 123456789、短い 123456 長い 1234567890 url?id=7654321";
        assert_eq!(caption_ids(caption), ["1234567", "123456789", "7654321"]);
    }

    #[test]
    fn inline_list_wins_without_requests() {
        let c = client(ScriptedTransport::new());
        let (list, source) =
            resolve_members(&c, &detail(&["5", "6", "5"], "9999999"), false).unwrap();
        assert_eq!(list.as_slice(), ["5", "6"]);
        assert_eq!(source, SeriesMemberSource::Inline);
        assert!(c.transport().requests().is_empty());
    }

    #[test]
    fn content_endpoint_is_second() {
        let c = client(
            ScriptedTransport::new()
                .on_json("/ajax/novel/series_content/77", content_page(&["8", "9"])),
        );
        let (list, source) = resolve_members(&c, &detail(&[], "1111111"), false).unwrap();
        assert_eq!(list.as_slice(), ["8", "9"]);
        assert_eq!(source, SeriesMemberSource::ContentEndpoint { paginated: false });
        assert!(c.transport().requests()[0].query.is_empty());
    }

    #[test]
    fn paginated_variant_sends_paging_params() {
        let c = client(
            ScriptedTransport::new()
                .on_json("/ajax/novel/series_content/77", content_page(&["8"])),
        );
        let (_, source) = resolve_members(&c, &detail(&[], ""), true).unwrap();
        assert_eq!(source, SeriesMemberSource::ContentEndpoint { paginated: true });
        assert_eq!(c.transport().requests()[0].param("order"), Some("asc"));
    }

    #[test]
    fn caption_is_last_resort_and_endpoint_errors_are_tolerated() {
        let c = client(
            ScriptedTransport::new()
                .on("/ajax/novel/series_content/77", [HttpReply::status(500)]),
        );
        let (list, source) =
            resolve_members(&c, &detail(&[], "読む順: 2222222 → 3333333 → 2222222"), false)
                .unwrap();
        assert_eq!(list.as_slice(), ["2222222", "3333333"]);
        assert_eq!(source, SeriesMemberSource::Caption);
    }

    #[test]
    fn nothing_found_is_none() {
        let c = client(
            ScriptedTransport::new()
                .on_json("/ajax/novel/series_content/77", content_page(&[])),
        );
        assert!(resolve_members(&c, &detail(&[], "no ids here 12"), false).is_none());
    }
}
