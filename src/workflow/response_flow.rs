//! 单份问卷的作答流程 - 流程层
//!
//! 流程顺序：
//! 1. 读取 response 详情
//! 2. 读取问卷题目
//! 3. 加载答案文件 → 生成答案
//! 4. 组装信封 → PUT 提交

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::{HttpRequest, HttpTransport};
use crate::models::{load_answer_key, AnswerableResponse, SurveySchema};
use crate::services::answer_synthesizer::{
    build_submission, random_write_time, synthesize, SynthesisOptions,
};
use crate::services::AuthenticatedClient;
use crate::workflow::response_ctx::ResponseCtx;

/// 单份问卷的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    /// 服务端接受了提交
    Submitted,
    /// 服务端拒绝了提交（非 200）
    Rejected { status: u16 },
}

/// 单份问卷的作答流程
///
/// - 只处理一个 response
/// - 不关心问卷是怎么被发现和激活的
pub struct ResponseFlow<'a, T> {
    client: &'a AuthenticatedClient<T>,
    answer_key_path: PathBuf,
    options: SynthesisOptions,
}

impl<'a, T: HttpTransport> ResponseFlow<'a, T> {
    pub fn new(
        client: &'a AuthenticatedClient<T>,
        answer_key_path: impl Into<PathBuf>,
        options: SynthesisOptions,
    ) -> Self {
        Self {
            client,
            answer_key_path: answer_key_path.into(),
            options,
        }
    }

    pub async fn run(&self, target: &AnswerableResponse, ctx: &ResponseCtx) -> AppResult<ProcessResult> {
        self.touch_response(ctx).await;

        let schema = self.fetch_schema(ctx).await?;
        info!("{} 📋 共 {} 道题目", ctx, schema.questions.len());

        // 每次作答都重新读取答案文件
        let answer_key = load_answer_key(&self.answer_key_path).await?;
        let answers = synthesize(&schema.questions, &answer_key, self.options);
        let unanswered = answers.iter().filter(|a| a.answer.is_empty()).count();
        if unanswered > 0 {
            debug!("{} {} 道题目未找到答案，将留空提交", ctx, unanswered);
        }

        let envelope = build_submission(&target.response, answers, random_write_time())?;

        info!("{} 📤 正在提交答案...", ctx);
        let request = HttpRequest::put(self.client.api_url(&format!("responses/{}", ctx.response_id)))
            .header("accept", "application/json, text/plain, */*")
            .header("accept-language", "zh-TW,zh;q=0.9,en;q=0.8")
            .header("cache-control", "no-cache")
            .header("pragma", "no-cache")
            .json(envelope);
        let response = self.client.send(request).await?;

        if response.is_ok() {
            Ok(ProcessResult::Submitted)
        } else {
            Ok(ProcessResult::Rejected {
                status: response.status,
            })
        }
    }

    /// 读取 response 详情；结果只用于日志，失败不影响后续步骤
    async fn touch_response(&self, ctx: &ResponseCtx) {
        let url = self.client.api_url(&format!("responses/{}", ctx.response_id));
        match self.client.send(HttpRequest::get(url)).await {
            Ok(response) if response.is_ok() => debug!("{} response 详情已读取", ctx),
            Ok(response) => warn!("{} ⚠️ 读取 response 详情返回 {}", ctx, response.status),
            Err(e) => warn!("{} ⚠️ 读取 response 详情失败: {}", ctx, e),
        }
    }

    async fn fetch_schema(&self, ctx: &ResponseCtx) -> AppResult<SurveySchema> {
        let url = self.client.api_url(&format!("surveys/{}", ctx.survey_id));
        let response = self.client.send(HttpRequest::get(&url)).await?;
        if !response.is_ok() {
            return Err(AppError::bad_status(url, response.status));
        }
        response.json()
    }
}
