//! 基础设施层：持有唯一的 HTTP 会话（cookie jar），只暴露"发请求"的能力

pub mod http_transport;
#[cfg(test)]
pub mod mock;

pub use http_transport::{Body, HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
