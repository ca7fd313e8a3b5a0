//! 应用入口 - 编排层
//!
//! 1. **初始化**：日志文件、凭据、HTTP 会话
//! 2. **登录**：跑完 CAS 登录状态机，未通过身份校验时终止
//! 3. **运行**：委托 `SurveyOrchestrator` 处理所有问卷
//! 4. **统计**：汇总每份问卷的结果

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use crate::config::Config;
use crate::infrastructure::ReqwestTransport;
use crate::orchestrator::survey_orchestrator::SurveyOrchestrator;
use crate::services::answer_synthesizer::SynthesisOptions;
use crate::services::captcha::{CaptchaSolver, ManualClassifier};
use crate::services::{AuthSession, AuthenticatedClient};
use crate::utils::logging::{append_outcome, init_log_file, log_startup, print_final_stats};

/// 应用主结构
pub struct App {
    config: Config,
    client: AuthenticatedClient<ReqwestTransport>,
}

impl App {
    /// 初始化应用并完成登录
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(&config);

        let credentials = config.credentials()?;
        let transport = ReqwestTransport::new(Duration::from_secs(config.request_timeout_secs))?;
        let solver = CaptchaSolver::new(ManualClassifier::new(&config.captcha_image_path));

        let client = AuthSession::new(transport, &config, credentials, solver)
            .login_verified()
            .await?;

        Ok(Self { config, client })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let orchestrator = SurveyOrchestrator::new(&self.client, self.config.answer_key_path.as_str())?;
        let options = SynthesisOptions {
            use_hard_answers: self.config.use_hard_answers,
            use_high_score: self.config.use_high_score,
        };

        let outcomes = orchestrator.process_all(options).await;
        if outcomes.is_empty() {
            warn!("⚠️ 没有需要填写的问卷，程序结束");
            return Ok(());
        }

        for outcome in &outcomes {
            append_outcome(&self.config.output_log_file, outcome)
                .with_context(|| format!("无法写入日志文件: {}", self.config.output_log_file))?;
        }

        let submitted = outcomes.iter().filter(|o| o.submitted).count();
        print_final_stats(
            submitted,
            outcomes.len() - submitted,
            outcomes.len(),
            &self.config.output_log_file,
        );

        Ok(())
    }
}
