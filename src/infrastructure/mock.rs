//! 测试用的脚本化传输：按 方法 + 完整 URL 返回预设响应，并记录所有请求

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value as JsonValue;

use crate::error::{AppError, AppResult};
use crate::infrastructure::{HttpRequest, HttpResponse, HttpTransport, Method};

struct Route {
    method: Method,
    url: String,
    responses: VecDeque<HttpResponse>,
}

#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
    unreachable: Mutex<Vec<(Method, String)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册响应；同一路由多次注册时按顺序返回，最后一个会被重复使用
    pub fn on(&self, method: Method, url: &str, response: HttpResponse) -> &Self {
        let mut routes = self.routes.lock().unwrap();
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.url == url)
        {
            Some(route) => route.responses.push_back(response),
            None => routes.push(Route {
                method,
                url: url.to_string(),
                responses: VecDeque::from([response]),
            }),
        }
        self
    }

    /// 清空某个路由已有的响应，改为只返回给定响应
    pub fn replace(&self, method: Method, url: &str, response: HttpResponse) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .retain(|r| !(r.method == method && r.url == url));
        self.on(method, url, response)
    }

    /// 该路由在传输层失败（连接不上），而不是返回某个状态码
    pub fn unreachable(&self, method: Method, url: &str) -> &Self {
        self.unreachable
            .lock()
            .unwrap()
            .push((method, url.to_string()));
        self
    }

    pub fn on_json(&self, method: Method, url: &str, status: u16, body: JsonValue) -> &Self {
        self.on(method, url, respond(status, url, body.to_string()))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: Method, url: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.url == url)
            .collect()
    }
}

pub fn respond(status: u16, url: &str, body: impl Into<String>) -> HttpResponse {
    HttpResponse {
        status,
        url: url.to_string(),
        body: body.into(),
    }
}

impl HttpTransport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> AppResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if self
            .unreachable
            .lock()
            .unwrap()
            .iter()
            .any(|(method, url)| *method == request.method && *url == request.url)
        {
            let source = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
            return Err(AppError::api_request_failed(request.url.clone(), source));
        }

        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| r.method == request.method && r.url == request.url);

        let response = match route {
            Some(route) if route.responses.len() > 1 => route.responses.pop_front(),
            Some(route) => route.responses.front().cloned(),
            None => None,
        };
        Ok(response.unwrap_or_else(|| respond(404, &request.url, "")))
    }
}
