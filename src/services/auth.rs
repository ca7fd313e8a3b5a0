//! CAS 登录 - 业务能力层
//!
//! 登录是一条有先后依赖的步骤链，这里写成显式的状态机：
//!
//! ```text
//! Init → CasUrlResolved → LoginFormLoaded → CaptchaObtained
//!      → CredentialsSubmitted → TicketExtracted → TokenAcquired → Verified
//! ```
//!
//! 每条边一个转移函数；任何一步失败都返回携带当前状态名的 [`LoginError`]。
//! 登录成功后得到不可变的 [`AuthenticatedClient`]，后续所有组件只通过它发请求。

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LoginError, LoginStage};
use crate::infrastructure::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::models::{CaptchaChallenge, Credentials, Id};
use crate::services::captcha::{CaptchaSolver, OcrClassifier};

static TICKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ticket=([^&#]+)").expect("valid ticket regex"));
static FORM_ACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"action="(\S+)""#).expect("valid form action regex"));

/// 登录状态机的状态，携带进入下一步所需的数据
#[derive(Debug, Clone, PartialEq)]
enum LoginState {
    Init,
    CasUrlResolved {
        cas_url: String,
    },
    LoginFormLoaded {
        action: String,
    },
    CaptchaObtained {
        action: String,
        captcha_code: String,
        captcha_key: String,
    },
    CredentialsSubmitted {
        final_url: String,
    },
    TicketExtracted {
        ticket: String,
    },
    TokenAcquired {
        token: String,
    },
    Verified {
        token: String,
        user_id: Option<String>,
    },
}

impl LoginState {
    fn stage(&self) -> LoginStage {
        match self {
            LoginState::Init => LoginStage::Init,
            LoginState::CasUrlResolved { .. } => LoginStage::CasUrlResolved,
            LoginState::LoginFormLoaded { .. } => LoginStage::LoginFormLoaded,
            LoginState::CaptchaObtained { .. } => LoginStage::CaptchaObtained,
            LoginState::CredentialsSubmitted { .. } => LoginStage::CredentialsSubmitted,
            LoginState::TicketExtracted { .. } => LoginStage::TicketExtracted,
            LoginState::TokenAcquired { .. } => LoginStage::TokenAcquired,
            LoginState::Verified { .. } => LoginStage::Verified,
        }
    }
}

/// 未登录的会话：持有 cookie 会话、凭据和验证码求解器
pub struct AuthSession<T, C> {
    transport: T,
    credentials: Credentials,
    solver: CaptchaSolver<C>,
    base_url: String,
    api_url: String,
    captcha_url: String,
}

impl<T: HttpTransport, C: OcrClassifier> AuthSession<T, C> {
    pub fn new(
        transport: T,
        config: &Config,
        credentials: Credentials,
        solver: CaptchaSolver<C>,
    ) -> Self {
        Self {
            transport,
            credentials,
            solver,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            captcha_url: config.captcha_url.clone(),
        }
    }

    /// 走完整个登录流程
    ///
    /// 前六步的失败都是致命的。最后一步身份校验失败不会报错，
    /// 返回的客户端 `is_verified()` 为 false，由调用方决定如何处理。
    pub async fn login(self) -> Result<AuthenticatedClient<T>, LoginError> {
        let mut state = LoginState::Init;
        loop {
            if let LoginState::Verified { token, user_id } = state {
                return Ok(AuthenticatedClient::new(
                    self.transport,
                    self.base_url,
                    self.api_url,
                    token,
                    user_id,
                ));
            }
            debug!("登录状态: {}", state.stage());
            state = self.step(state).await?;
        }
    }

    /// 登录并要求身份校验通过，供应用入口使用
    pub async fn login_verified(self) -> AppResult<AuthenticatedClient<T>> {
        let client = self.login().await?;
        if !client.is_verified() {
            return Err(LoginError::new(LoginStage::Verified, "identity verification failed").into());
        }
        Ok(client)
    }

    async fn step(&self, state: LoginState) -> Result<LoginState, LoginError> {
        match state {
            LoginState::Init => self.resolve_cas_url().await,
            LoginState::CasUrlResolved { cas_url } => self.load_login_form(&cas_url).await,
            LoginState::LoginFormLoaded { action } => self.obtain_captcha(action).await,
            LoginState::CaptchaObtained {
                action,
                captcha_code,
                captcha_key,
            } => {
                self.submit_credentials(&action, captcha_code, captcha_key)
                    .await
            }
            LoginState::CredentialsSubmitted { final_url } => extract_ticket(&final_url),
            LoginState::TicketExtracted { ticket } => self.exchange_ticket(&ticket).await,
            LoginState::TokenAcquired { token } => Ok(self.verify(token).await),
            verified @ LoginState::Verified { .. } => Ok(verified),
        }
    }

    async fn send(&self, stage: LoginStage, request: HttpRequest) -> Result<HttpResponse, LoginError> {
        self.transport
            .execute(request)
            .await
            .map_err(|e| LoginError::new(stage, e.to_string()))
    }

    /// Init → CasUrlResolved
    async fn resolve_cas_url(&self) -> Result<LoginState, LoginError> {
        let stage = LoginStage::Init;
        let response = self
            .send(stage, HttpRequest::get(format!("{}/cas", self.base_url)))
            .await?;
        if !response.is_ok() {
            return Err(LoginError::new(stage, "CAS URL unavailable"));
        }

        let cas_url = response
            .json::<JsonValue>()
            .ok()
            .and_then(|value| parse_cas_url(&value))
            .ok_or_else(|| LoginError::new(stage, "CAS URL unavailable"))?;

        info!("🔗 CAS 登录地址: {}", cas_url);
        Ok(LoginState::CasUrlResolved { cas_url })
    }

    /// CasUrlResolved → LoginFormLoaded
    async fn load_login_form(&self, cas_url: &str) -> Result<LoginState, LoginError> {
        let stage = LoginStage::CasUrlResolved;
        let response = self.send(stage, HttpRequest::get(cas_url)).await?;
        let action = extract_form_action(&response.body)
            .ok_or_else(|| LoginError::new(stage, "login form not found"))?;

        debug!("登录表单提交地址: {}", action);
        Ok(LoginState::LoginFormLoaded { action })
    }

    /// LoginFormLoaded → CaptchaObtained
    async fn obtain_captcha(&self, action: String) -> Result<LoginState, LoginError> {
        let stage = LoginStage::LoginFormLoaded;
        let response = self
            .send(stage, HttpRequest::get(&self.captcha_url))
            .await?;
        let challenge: CaptchaChallenge = response
            .json()
            .map_err(|e| LoginError::new(stage, format!("captcha unavailable: {}", e)))?;

        let captcha_code = self
            .solver
            .solve(&challenge)
            .map_err(|e| LoginError::new(stage, format!("captcha unsolved: {}", e)))?;
        if captcha_code.is_empty() {
            return Err(LoginError::new(stage, "captcha unsolved: empty text"));
        }

        info!("🔤 验证码识别结果: {}", captcha_code);
        Ok(LoginState::CaptchaObtained {
            action,
            captcha_code,
            captcha_key: challenge.key,
        })
    }

    /// CaptchaObtained → CredentialsSubmitted
    async fn submit_credentials(
        &self,
        action: &str,
        captcha_code: String,
        captcha_key: String,
    ) -> Result<LoginState, LoginError> {
        let stage = LoginStage::CaptchaObtained;
        let form = vec![
            ("username".to_string(), self.credentials.account().to_string()),
            ("password".to_string(), self.credentials.password().to_string()),
            ("captchaCode".to_string(), captcha_code),
            ("captchaKey".to_string(), captcha_key),
        ];
        let response = self.send(stage, HttpRequest::post(action).form(form)).await?;

        debug!("登录提交后跳转至: {}", response.url);
        Ok(LoginState::CredentialsSubmitted {
            final_url: response.url,
        })
    }

    /// TicketExtracted → TokenAcquired
    async fn exchange_ticket(&self, ticket: &str) -> Result<LoginState, LoginError> {
        let stage = LoginStage::TicketExtracted;
        let url = format!("{}/users/verify/cas?ticket={}", self.base_url, ticket);
        let response = self.send(stage, HttpRequest::get(url)).await?;
        if !response.is_ok() {
            return Err(LoginError::new(stage, "token not found"));
        }

        let token = response
            .json::<JsonValue>()
            .ok()
            .and_then(|value| {
                value
                    .pointer("/token/access_token")
                    .and_then(JsonValue::as_str)
                    .map(str::to_string)
            })
            .filter(|token| !token.is_empty())
            .ok_or_else(|| LoginError::new(stage, "token not found"))?;

        info!("🔑 已取得 access token");
        Ok(LoginState::TokenAcquired { token })
    }

    /// TokenAcquired → Verified
    async fn verify(&self, token: String) -> LoginState {
        let user_id = match fetch_identity(&self.transport, &self.base_url, &token).await {
            Ok(Some(user_id)) => {
                info!("✓ 登录成功，用户 ID: {}", user_id);
                Some(user_id)
            }
            Ok(None) => {
                warn!("⚠️ 身份校验未通过，会话未登录");
                None
            }
            Err(e) => {
                warn!("⚠️ 身份校验请求失败: {}", e);
                None
            }
        };
        LoginState::Verified { token, user_id }
    }
}

/// CredentialsSubmitted → TicketExtracted
fn extract_ticket(final_url: &str) -> Result<LoginState, LoginError> {
    let ticket = TICKET_RE
        .captures(final_url)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| LoginError::new(LoginStage::CredentialsSubmitted, "ticket not found"))?;
    Ok(LoginState::TicketExtracted { ticket })
}

/// `/cas` 的返回：通常是一个 JSON 字符串，也兼容对象里的第一个字符串值
fn parse_cas_url(value: &JsonValue) -> Option<String> {
    let url = match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Object(map) => map.values().find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    }?;
    let url = url.trim().to_string();
    (!url.is_empty()).then_some(url)
}

/// 从登录页 HTML 中取出表单的 action，并还原 `&amp;`
fn extract_form_action(html: &str) -> Option<String> {
    FORM_ACTION_RE
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
}

/// 请求 `/users/me`：200 时返回用户 ID，其他状态返回 None
async fn fetch_identity<T: HttpTransport>(
    transport: &T,
    base_url: &str,
    token: &str,
) -> AppResult<Option<String>> {
    let request = HttpRequest::get(format!("{}/users/me", base_url)).bearer(token);
    let response = transport.execute(request).await?;
    if !response.is_ok() {
        return Ok(None);
    }
    let me: JsonValue = response.json()?;
    Ok(me
        .get("id")
        .filter(|id| !id.is_null())
        .map(|id| Id::from_value(id.clone()).to_string()))
}

/// 已登录的客户端
///
/// 持有 cookie 会话与 bearer token；所有后续请求都通过它发出，并自动带上
/// `Authorization: Bearer <token>`。
pub struct AuthenticatedClient<T> {
    transport: T,
    base_url: String,
    api_url: String,
    token: String,
    user_id: Option<String>,
}

impl<T> AuthenticatedClient<T> {
    pub(crate) fn new(
        transport: T,
        base_url: String,
        api_url: String,
        token: String,
        user_id: Option<String>,
    ) -> Self {
        Self {
            transport,
            base_url,
            api_url,
            token,
            user_id,
        }
    }
}

// token 不进日志
impl<T> fmt::Debug for AuthenticatedClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("api_url", &self.api_url)
            .field("user_id", &self.user_id)
            .field("token", &"***")
            .finish()
    }
}

impl<T: HttpTransport> AuthenticatedClient<T> {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// 登录时（或最近一次 `is_authenticated`）身份校验是否通过
    pub fn is_verified(&self) -> bool {
        self.user_id.is_some()
    }

    /// 重新请求身份接口，顺带刷新保存的用户 ID
    ///
    /// 非幂等：失败时会清空用户 ID。
    pub async fn is_authenticated(&mut self) -> bool {
        match fetch_identity(&self.transport, &self.base_url, &self.token).await {
            Ok(user_id) => {
                self.user_id = user_id;
            }
            Err(e) => {
                warn!("⚠️ 身份校验请求失败: {}", e);
                self.user_id = None;
            }
        }
        self.user_id.is_some()
    }

    /// 问卷服务 API 的完整地址
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    /// 发送请求，自动附带 bearer 头
    pub async fn send(&self, request: HttpRequest) -> AppResult<HttpResponse> {
        self.transport.execute(request.bearer(&self.token)).await
    }

    /// 对问卷服务 API 发起带认证的请求
    pub async fn authenticated_request(
        &self,
        method: Method,
        path: &str,
        body: Option<JsonValue>,
    ) -> AppResult<HttpResponse> {
        let url = self.api_url(path);
        let request = match method {
            Method::Get => HttpRequest::get(url),
            Method::Post => HttpRequest::post(url),
            Method::Put => HttpRequest::put(url),
        };
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };
        self.send(request).await
    }

    /// 已登录用户的 ID；身份校验未通过时报错
    pub fn require_user_id(&self) -> AppResult<&str> {
        self.user_id
            .as_deref()
            .ok_or_else(|| AppError::Other("会话未通过身份校验，没有用户 ID".to_string()))
    }
}
