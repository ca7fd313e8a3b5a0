pub mod response_ctx;
pub mod response_flow;

pub use response_ctx::ResponseCtx;
pub use response_flow::{ProcessResult, ResponseFlow};
