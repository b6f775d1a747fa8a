//! 测试用的脚本化 `Transport`：按 URL 前缀回放预设响应，并记录每一次请求。

use std::cell::RefCell;
use std::collections::VecDeque;

use super::{FetchError, HttpReply, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

type Responder = Box<dyn Fn(&RecordedRequest) -> Option<HttpReply>>;

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: RefCell<Vec<(String, VecDeque<HttpReply>)>>,
    dynamic: Vec<(String, Responder)>,
    requests: RefCell<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL 以 `url_suffix` 结尾的请求依次返回这些响应；最后一个响应会被重复使用。
    pub fn on(self, url_suffix: &str, replies: impl IntoIterator<Item = HttpReply>) -> Self {
        self.routes
            .borrow_mut()
            .push((url_suffix.to_string(), replies.into_iter().collect()));
        self
    }

    pub fn on_json(self, url_suffix: &str, body: serde_json::Value) -> Self {
        self.on(url_suffix, [HttpReply::ok(body.to_string())])
    }

    /// 根据请求（含查询参数）动态生成响应。
    pub fn on_fn(
        mut self,
        url_suffix: &str,
        f: impl Fn(&RecordedRequest) -> Option<HttpReply> + 'static,
    ) -> Self {
        self.dynamic.push((url_suffix.to_string(), Box::new(f)));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpReply, FetchError> {
        let request = RecordedRequest {
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        };
        self.requests.borrow_mut().push(request.clone());

        for (suffix, f) in &self.dynamic {
            if url.ends_with(suffix.as_str())
                && let Some(reply) = f(&request)
            {
                return Ok(reply);
            }
        }

        let mut routes = self.routes.borrow_mut();
        if let Some((_, queue)) = routes
            .iter_mut()
            .find(|(suffix, _)| url.ends_with(suffix.as_str()))
        {
            let reply = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            if let Some(reply) = reply {
                return Ok(reply);
            }
        }

        Ok(HttpReply::status(404))
    }
}
