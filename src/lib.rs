//! # TronClass Survey
//!
//! 自动登录 CAS（带验证码），发现并自动填写待完成的课程问卷
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有唯一的 cookie 会话，只暴露"发请求"能力
//! - `HttpTransport` - 请求能力的抽象，`ReqwestTransport` 为真实实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `CaptchaSolver` - 验证码识别（OCR 黑盒可替换）
//! - `AuthSession` - CAS 登录状态机，产出 `AuthenticatedClient`
//! - `answer_synthesizer` - 按题型生成答案
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份问卷"的完整作答流程
//! - `ResponseCtx` - 上下文封装（response + 问卷 + 名称）
//! - `ResponseFlow` - 流程编排（题目 → 答案 → 提交）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用生命周期、登录、统计
//! - `orchestrator/survey_orchestrator` - 发现、激活、逐份作答
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, LoginError, LoginStage};
pub use infrastructure::{HttpTransport, ReqwestTransport};
pub use models::AnswerKeyStore;
pub use orchestrator::{App, SurveyOrchestrator, SurveyOutcome};
pub use services::{AuthSession, AuthenticatedClient, CaptchaSolver, OcrClassifier};
pub use workflow::{ProcessResult, ResponseCtx, ResponseFlow};
