//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、登录、运行、统计）
//! - 唯一持有已登录客户端（`AuthenticatedClient`）
//!
//! ### `survey_orchestrator` - 问卷编排器
//! - 发现、激活可填写的问卷
//! - 逐份委托 `ResponseFlow` 作答
//!
//! ## 层次关系
//!
//! ```text
//! app (登录 + 统计)
//!     ↓
//! survey_orchestrator (处理 Vec<Response>)
//!     ↓
//! workflow::ResponseFlow (处理单份问卷)
//!     ↓
//! services (能力层：auth / captcha / answer_synthesizer)
//!     ↓
//! infrastructure (基础设施：HttpTransport)
//! ```

pub mod app;
pub mod survey_orchestrator;

pub use app::App;
pub use survey_orchestrator::{SurveyOrchestrator, SurveyOutcome};
