//! 问卷编排器 - 编排层
//!
//! ## 职责
//!
//! 1. **发现**：拉取进行中、可填写的问卷列表
//! 2. **激活**：为还没有 response 的评价对象创建 response（按问卷合并）
//! 3. **再次拉取**：激活在服务端是异步的，需要重新拉取列表才能看到新的 response
//! 4. **作答**：逐份委托 `ResponseFlow` 处理，单份失败不影响其他问卷
//!
//! 所有问卷严格顺序处理，不并发。

use serde_json::{json, Value as JsonValue};
use tracing::{debug, error, info, warn};

use crate::error::AppResult;
use crate::infrastructure::{HttpRequest, HttpTransport, Method};
use crate::models::{AnswerableResponse, Id, SurveyTarget};
use crate::services::answer_synthesizer::SynthesisOptions;
use crate::services::AuthenticatedClient;
use crate::workflow::{ProcessResult, ResponseCtx, ResponseFlow};

/// 单份问卷的处理结果
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyOutcome {
    pub response_id: Id,
    pub name: String,
    pub submitted: bool,
}

pub struct SurveyOrchestrator<'a, T> {
    client: &'a AuthenticatedClient<T>,
    user_id: String,
    answer_key_path: String,
}

impl<'a, T: HttpTransport> SurveyOrchestrator<'a, T> {
    /// 需要已通过身份校验的客户端（激活与列表接口都要用户 ID）
    pub fn new(client: &'a AuthenticatedClient<T>, answer_key_path: impl Into<String>) -> AppResult<Self> {
        let user_id = client.require_user_id()?.to_string();
        Ok(Self {
            client,
            user_id,
            answer_key_path: answer_key_path.into(),
        })
    }

    /// 拉取可填写的问卷列表；任何失败都返回空列表
    pub async fn list_writable_surveys(&self) -> Vec<SurveyTarget> {
        let request = HttpRequest::get(self.client.api_url("plans/me/canWrite"))
            .query("user_id", self.user_id.as_str())
            .query("plan_status", "InProgress");

        let response = match self.client.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("⚠️ 获取问卷列表失败: {}", e);
                return Vec::new();
            }
        };
        if !response.is_ok() {
            warn!("⚠️ 获取问卷列表返回 {}", response.status);
            return Vec::new();
        }

        let entries: Vec<JsonValue> = match response.json() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("⚠️ 问卷列表解析失败: {}", e);
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<SurveyTarget>(entry) {
                Ok(target) => Some(target),
                Err(e) => {
                    warn!("⚠️ 跳过无法解析的问卷项: {}", e);
                    None
                }
            })
            .collect()
    }

    /// 激活一份问卷下的若干评价对象
    ///
    /// 任何失败都返回 false，由调用方记录后继续处理其他问卷。
    pub async fn activate(&self, survey_id: &Id, target_ids: &[Id]) -> bool {
        match self.try_activate(survey_id, target_ids).await {
            Ok(activated) => activated,
            Err(e) => {
                debug!("激活问卷 {} 出错: {}", survey_id, e);
                false
            }
        }
    }

    async fn try_activate(&self, survey_id: &Id, target_ids: &[Id]) -> AppResult<bool> {
        // 访问计划页会让服务端打开这份问卷，响应内容不需要
        self.client
            .authenticated_request(Method::Get, &format!("plan/{}", survey_id), None)
            .await?;

        let response = self
            .client
            .authenticated_request(
                Method::Post,
                &format!("surveys/{}/respondents/{}/responses", survey_id, self.user_id),
                Some(json!({ "targets": target_ids })),
            )
            .await?;
        if !response.is_ok() {
            return Ok(false);
        }

        let confirm = HttpRequest::get(self.client.api_url("responses"))
            .query("survey_id", survey_id.to_string())
            .query("respondent_id", self.user_id.as_str());
        Ok(self.client.send(confirm).await?.is_ok())
    }

    /// 激活所有未激活的评价对象，然后返回可作答的 response
    ///
    /// 固定拉取两次列表；第二次拉取前不等待服务端完成创建。
    pub async fn discover_answerable_responses(&self) -> Vec<AnswerableResponse> {
        let listing = self.list_writable_surveys().await;

        for (survey_id, target_ids) in group_unactivated(&listing) {
            info!(
                "🔓 激活问卷 {}（{} 个评价对象）",
                survey_id,
                target_ids.len()
            );
            if !self.activate(&survey_id, &target_ids).await {
                warn!("⚠️ 问卷 {} 激活失败", survey_id);
            }
        }

        let listing = self.list_writable_surveys().await;
        collect_answerable(listing)
    }

    /// 处理所有可作答的问卷，返回每份问卷的结果
    pub async fn process_all(&self, options: SynthesisOptions) -> Vec<SurveyOutcome> {
        let targets = self.discover_answerable_responses().await;
        info!("✓ 找到 {} 份待填写的问卷", targets.len());

        let flow = ResponseFlow::new(self.client, self.answer_key_path.as_str(), options);
        let mut outcomes = Vec::with_capacity(targets.len());

        for (index, target) in targets.iter().enumerate() {
            let ctx = ResponseCtx::new(index + 1, target);
            let submitted = match flow.run(target, &ctx).await {
                Ok(ProcessResult::Submitted) => {
                    info!("{} ✅ 问卷 {} 填写成功", ctx, target.name);
                    true
                }
                Ok(ProcessResult::Rejected { status }) => {
                    warn!("{} ❌ 问卷 {} 提交被拒绝 (status={})", ctx, target.name, status);
                    false
                }
                Err(e) => {
                    error!("{} ❌ 问卷 {} 处理失败: {}", ctx, target.name, e);
                    false
                }
            };
            outcomes.push(SurveyOutcome {
                response_id: ctx.response_id.clone(),
                name: target.name.clone(),
                submitted,
            });
        }

        outcomes
    }
}

/// 把未激活的评价对象按问卷 ID 分组，保持首次出现的顺序
fn group_unactivated(listing: &[SurveyTarget]) -> Vec<(Id, Vec<Id>)> {
    let mut groups: Vec<(Id, Vec<Id>)> = Vec::new();
    for entry in listing.iter().filter(|entry| entry.is_unactivated()) {
        let target_id = entry.targets.target_id.clone();
        match groups.iter_mut().find(|(id, _)| *id == entry.survey_id) {
            Some((_, target_ids)) => target_ids.push(target_id),
            None => groups.push((entry.survey_id.clone(), vec![target_id])),
        }
    }
    groups
}

/// 取出已有 response 的项；同一个 response 出现多次时以最后一次为准
fn collect_answerable(listing: Vec<SurveyTarget>) -> Vec<AnswerableResponse> {
    let mut answerable: Vec<AnswerableResponse> = Vec::new();
    for entry in listing {
        let Some(response) = entry.response else {
            continue;
        };
        let item = AnswerableResponse {
            response,
            name: entry.targets.name,
        };
        match answerable
            .iter_mut()
            .find(|existing| existing.response.id == item.response.id)
        {
            Some(existing) => *existing = item,
            None => answerable.push(item),
        }
    }
    answerable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::infrastructure::mock::{respond, MockTransport};
    use crate::infrastructure::Body;
    use serde_json::json;

    const API: &str = "https://qsurvey.test/survey-service/api/v1";
    const BASE: &str = "https://qsurvey.test/survey-api/api";

    fn client(transport: &MockTransport) -> AuthenticatedClient<&MockTransport> {
        AuthenticatedClient::new(
            transport,
            BASE.to_string(),
            API.to_string(),
            "tok".to_string(),
            Some("7".to_string()),
        )
    }

    fn listing_url() -> String {
        format!("{}/plans/me/canWrite", API)
    }

    fn unactivated(survey_id: u64, target_id: &str, name: &str) -> JsonValue {
        json!({ "survey_id": survey_id, "response": null, "targets": { "target_id": target_id, "name": name } })
    }

    fn activated(survey_id: u64, response_id: u64, name: &str) -> JsonValue {
        json!({
            "survey_id": survey_id,
            "response": { "id": response_id, "survey_id": survey_id },
            "targets": { "target_id": format!("t{}", response_id), "name": name }
        })
    }

    #[tokio::test]
    async fn targets_of_the_same_survey_are_activated_together() {
        let transport = MockTransport::new();
        transport.on_json(
            Method::Get,
            &listing_url(),
            200,
            json!([unactivated(12, "t1", "微积分"), unactivated(12, "t2", "线性代数")]),
        );
        transport.on_json(
            Method::Get,
            &listing_url(),
            200,
            json!([activated(12, 501, "微积分"), activated(12, 502, "线性代数")]),
        );
        let create_url = format!("{}/surveys/12/respondents/7/responses", API);
        transport.on_json(Method::Post, &create_url, 200, json!({}));
        transport.on_json(Method::Get, &format!("{}/responses", API), 200, json!([]));

        let client = client(&transport);
        let orchestrator = SurveyOrchestrator::new(&client, "unused.json").unwrap();
        let found = orchestrator.discover_answerable_responses().await;

        let creates = transport.requests_to(Method::Post, &create_url);
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].body, Body::Json(json!({ "targets": ["t1", "t2"] })));
        assert_eq!(
            transport.requests_to(Method::Get, &format!("{}/plan/12", API)).len(),
            1
        );
        assert_eq!(transport.requests_to(Method::Get, &listing_url()).len(), 2);

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "微积分");
        assert_eq!(found[1].response.id, Id::from(502));
    }

    #[tokio::test]
    async fn already_activated_targets_are_not_activated_again() {
        let transport = MockTransport::new();
        transport.on_json(Method::Get, &listing_url(), 200, json!([activated(12, 501, "微积分")]));

        let client = client(&transport);
        let orchestrator = SurveyOrchestrator::new(&client, "unused.json").unwrap();
        let found = orchestrator.discover_answerable_responses().await;

        assert_eq!(found.len(), 1);
        assert!(transport
            .requests()
            .iter()
            .all(|r| r.method == Method::Get && r.url == listing_url()));
    }

    #[tokio::test]
    async fn failed_activation_does_not_stop_other_surveys() {
        let transport = MockTransport::new();
        transport.on_json(
            Method::Get,
            &listing_url(),
            200,
            json!([unactivated(1, "a", "体育"), unactivated(2, "b", "英文")]),
        );
        transport.on_json(Method::Get, &listing_url(), 200, json!([activated(2, 900, "英文")]));
        transport.on_json(
            Method::Post,
            &format!("{}/surveys/1/respondents/7/responses", API),
            500,
            json!({ "message": "boom" }),
        );
        transport.on_json(
            Method::Post,
            &format!("{}/surveys/2/respondents/7/responses", API),
            200,
            json!({}),
        );
        transport.on_json(Method::Get, &format!("{}/responses", API), 200, json!([]));

        let client = client(&transport);
        let orchestrator = SurveyOrchestrator::new(&client, "unused.json").unwrap();
        assert!(!orchestrator.activate(&Id::from(1), &[Id::from("a")]).await);

        let found = orchestrator.discover_answerable_responses().await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "英文");
        assert_eq!(
            transport
                .requests_to(Method::Post, &format!("{}/surveys/2/respondents/7/responses", API))
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn unreachable_plan_page_fails_activation() {
        let transport = MockTransport::new();
        transport.unreachable(Method::Get, &format!("{}/plan/12", API));
        let create_url = format!("{}/surveys/12/respondents/7/responses", API);
        transport.on_json(Method::Post, &create_url, 200, json!({}));

        let client = client(&transport);
        let orchestrator = SurveyOrchestrator::new(&client, "unused.json").unwrap();
        assert!(!orchestrator.activate(&Id::from(12), &[Id::from("t1")]).await);
        assert!(transport.requests_to(Method::Post, &create_url).is_empty());
    }

    #[tokio::test]
    async fn non_200_listing_is_an_empty_list() {
        let transport = MockTransport::new();
        transport.on(Method::Get, &listing_url(), respond(502, "", "bad gateway"));

        let client = client(&transport);
        let orchestrator = SurveyOrchestrator::new(&client, "unused.json").unwrap();
        assert!(orchestrator.list_writable_surveys().await.is_empty());

        let listed = transport.requests_to(Method::Get, &listing_url());
        assert_eq!(
            listed[0].query,
            vec![
                ("user_id".to_string(), "7".to_string()),
                ("plan_status".to_string(), "InProgress".to_string()),
            ]
        );
        assert_eq!(listed[0].header_value("Authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn process_all_reports_each_survey_independently() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("answers.json");
        std::fs::write(
            &key_path,
            json!({ "每周学习时数": { "default": "3-5小時", "hard": "1-2小時" } }).to_string(),
        )
        .unwrap();

        let transport = MockTransport::new();
        transport.on_json(
            Method::Get,
            &listing_url(),
            200,
            json!([activated(12, 501, "微积分"), activated(13, 502, "线性代数")]),
        );
        transport.on_json(
            Method::Get,
            &format!("{}/surveys/12", API),
            200,
            json!({ "questions": [
                {
                    "id": 1, "question_number": 1, "type": "single_selection",
                    "heading": { "text": { "default": "每周学习时数" } },
                    "choices": [
                        { "id": "s1", "text": { "zh_tw": "1-2小時" } },
                        { "id": "s2", "text": { "zh_tw": "3-5小時" } }
                    ]
                },
                { "id": 2, "question_number": 2, "type": "short_answer" }
            ]}),
        );
        // 第二份问卷的题目拉取失败
        transport.on_json(Method::Get, &format!("{}/surveys/13", API), 404, json!({}));
        transport.on_json(Method::Put, &format!("{}/responses/501", API), 200, json!({}));

        let client = client(&transport);
        let orchestrator =
            SurveyOrchestrator::new(&client, key_path.to_string_lossy().to_string()).unwrap();
        let outcomes = orchestrator.process_all(SynthesisOptions::default()).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].submitted);
        assert_eq!(outcomes[0].name, "微积分");
        assert!(!outcomes[1].submitted);

        let puts = transport.requests_to(Method::Put, &format!("{}/responses/501", API));
        assert_eq!(puts.len(), 1);
        let Body::Json(envelope) = &puts[0].body else {
            panic!("expected json body");
        };
        assert_eq!(envelope["status"], json!("SUBMITTED"));
        assert_eq!(envelope["answers"].as_array().map(Vec::len), Some(2));
        assert_eq!(envelope["answers"][0]["answer"], json!(["s2"]));
        let write_time = envelope["write_time"].as_u64().unwrap();
        assert!((30..=500).contains(&write_time));
    }

    #[tokio::test]
    async fn rejected_submission_is_reported_and_later_surveys_still_run() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("answers.json");
        std::fs::write(&key_path, "{}").unwrap();

        let transport = MockTransport::new();
        transport.on_json(
            Method::Get,
            &listing_url(),
            200,
            json!([activated(12, 501, "微积分"), activated(13, 502, "线性代数")]),
        );
        let schema = json!({ "questions": [{ "id": 1, "question_number": 1, "type": "short_answer" }] });
        transport.on_json(Method::Get, &format!("{}/surveys/12", API), 200, schema.clone());
        transport.on_json(Method::Get, &format!("{}/surveys/13", API), 200, schema);
        transport.on_json(
            Method::Put,
            &format!("{}/responses/501", API),
            409,
            json!({ "message": "already submitted" }),
        );
        transport.on_json(Method::Put, &format!("{}/responses/502", API), 200, json!({}));

        let client = client(&transport);
        let orchestrator =
            SurveyOrchestrator::new(&client, key_path.to_string_lossy().to_string()).unwrap();
        let outcomes = orchestrator.process_all(SynthesisOptions::default()).await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].response_id, Id::from(501));
        assert!(!outcomes[0].submitted);
        assert!(outcomes[1].submitted);

        let puts = transport.requests_to(Method::Put, &format!("{}/responses/501", API));
        assert_eq!(puts.len(), 1);
        let put = &puts[0];
        assert_eq!(put.header_value("Authorization"), Some("Bearer tok"));
        assert_eq!(put.header_value("accept"), Some("application/json, text/plain, */*"));
        assert_eq!(put.header_value("accept-language"), Some("zh-TW,zh;q=0.9,en;q=0.8"));
        assert_eq!(put.header_value("cache-control"), Some("no-cache"));
        assert_eq!(put.header_value("pragma"), Some("no-cache"));
    }

    #[test]
    fn orchestrator_requires_a_verified_client() {
        let transport = MockTransport::new();
        let client = AuthenticatedClient::new(
            &transport,
            BASE.to_string(),
            API.to_string(),
            "tok".to_string(),
            None,
        );
        assert!(SurveyOrchestrator::new(&client, Config::default().answer_key_path).is_err());
    }
}
