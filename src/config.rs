use crate::error::{AppResult, ConfigError};
use crate::models::Credentials;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 登录账号
    pub account: String,
    /// 登录密码
    pub password: String,
    /// 认证相关 API（/cas、/users/...）
    pub base_url: String,
    /// 问卷服务 API（/plans、/surveys、/responses）
    pub api_url: String,
    /// 身份提供者的验证码接口
    pub captcha_url: String,
    /// 答案文件路径（.json 或 .toml）
    pub answer_key_path: String,
    /// 是否使用 hard 答案
    pub use_hard_answers: bool,
    /// 矩阵题是否选择最高分
    pub use_high_score: bool,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 手动识别验证码时图片的保存位置
    pub captcha_image_path: String,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account: String::new(),
            password: String::new(),
            base_url: "https://qsurvey.nfu.edu.tw/survey-api/api".to_string(),
            api_url: "https://qsurvey.nfu.edu.tw/survey-service/api/v1".to_string(),
            captcha_url: "https://identity.nfu.edu.tw/auth/realms/nfu/captcha/code".to_string(),
            answer_key_path: "./study_answers.json".to_string(),
            use_hard_answers: false,
            use_high_score: false,
            request_timeout_secs: 30,
            captcha_image_path: "captcha.png".to_string(),
            output_log_file: "survey_report.txt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            account: std::env::var("ACCOUNT").unwrap_or(default.account),
            password: std::env::var("PASSWORD").unwrap_or(default.password),
            base_url: std::env::var("SURVEY_BASE_URL").unwrap_or(default.base_url),
            api_url: std::env::var("SURVEY_API_URL").unwrap_or(default.api_url),
            captcha_url: std::env::var("CAPTCHA_URL").unwrap_or(default.captcha_url),
            answer_key_path: std::env::var("ANSWER_KEY_PATH").unwrap_or(default.answer_key_path),
            use_hard_answers: std::env::var("USE_HARD_ANSWERS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.use_hard_answers),
            use_high_score: std::env::var("USE_HIGH_SCORE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.use_high_score),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            captcha_image_path: std::env::var("CAPTCHA_IMAGE_PATH").unwrap_or(default.captcha_image_path),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }

    /// 取出登录凭据，账号或密码为空时报错
    pub fn credentials(&self) -> AppResult<Credentials> {
        if self.account.trim().is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "ACCOUNT".to_string(),
            }
            .into());
        }
        if self.password.is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "PASSWORD".to_string(),
            }
            .into());
        }
        Ok(Credentials::new(self.account.clone(), self.password.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn missing_account_is_a_config_error() {
        let config = Config {
            password: "secret".to_string(),
            ..Config::default()
        };
        let err = config.credentials().unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::EnvVarNotFound { ref var_name }) if var_name == "ACCOUNT"
        ));
    }

    #[test]
    fn credentials_are_taken_verbatim() {
        let config = Config {
            account: "41234567".to_string(),
            password: "p@ss".to_string(),
            ..Config::default()
        };
        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.account(), "41234567");
        assert_eq!(credentials.password(), "p@ss");
    }
}
