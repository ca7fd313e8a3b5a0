//! 问卷平台返回的数据结构
//!
//! 平台的 ID 有时是字符串、有时是数字，这里统一用 [`Id`] 原样保存，
//! 提交时再按原类型写回。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 平台 ID（字符串或数字，保持原样）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(Value);

impl Id {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self(Value::String(value))
    }
}

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        Self(Value::from(value))
    }
}

/// 验证码接口返回的挑战，一次性使用
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaChallenge {
    /// `data:image/png;base64,...` 形式的图片
    pub image: String,
    /// 提交登录表单时必须一起带上
    pub key: String,
}

/// `/plans/me/canWrite` 中的一项
#[derive(Debug, Clone, Deserialize)]
pub struct SurveyTarget {
    pub survey_id: Id,
    #[serde(default)]
    pub response: Option<ResponseRef>,
    pub targets: TargetInfo,
}

impl SurveyTarget {
    /// 尚未激活（服务端还没有为它创建 response）
    pub fn is_unactivated(&self) -> bool {
        self.response.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetInfo {
    pub target_id: Id,
    #[serde(default)]
    pub name: String,
}

/// 服务端在激活后创建的 response 记录
///
/// 除了 `id` 与 `survey_id`，其余字段原样保留，提交答案时作为信封的底稿。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct ResponseRef {
    pub id: Id,
    pub survey_id: Id,
    pub raw: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for ResponseRef {
    type Error = String;

    fn try_from(raw: Map<String, Value>) -> Result<Self, Self::Error> {
        let id = raw
            .get("id")
            .cloned()
            .ok_or_else(|| "response 缺少 id 字段".to_string())?;
        let survey_id = raw
            .get("survey_id")
            .cloned()
            .ok_or_else(|| "response 缺少 survey_id 字段".to_string())?;
        Ok(Self {
            id: Id(id),
            survey_id: Id(survey_id),
            raw,
        })
    }
}

/// 可以作答的 response，附带目标名称（用于日志）
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerableResponse {
    pub response: ResponseRef,
    pub name: String,
}

/// `/surveys/{id}` 的返回
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SurveySchema {
    #[serde(default)]
    pub questions: Vec<QuestionSchema>,
}

/// 题目类型，未知类型保留原始字符串
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum QuestionType {
    Matrix,
    SingleSelection,
    MultiSelection,
    ShortAnswer,
    Other(String),
}

impl QuestionType {
    pub fn as_str(&self) -> &str {
        match self {
            QuestionType::Matrix => "matrix",
            QuestionType::SingleSelection => "single_selection",
            QuestionType::MultiSelection => "multi_selection",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Other(s) => s,
        }
    }
}

impl From<String> for QuestionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "matrix" => QuestionType::Matrix,
            "single_selection" => QuestionType::SingleSelection,
            "multi_selection" => QuestionType::MultiSelection,
            "short_answer" => QuestionType::ShortAnswer,
            _ => QuestionType::Other(value),
        }
    }
}

/// 多语言文本，如 `{"en_us": "Agree", "zh_tw": "同意"}`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, Value>);

impl LocalizedText {
    /// 取某个语言的文本，不存在或不是字符串时返回 None
    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0.get(lang).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Choice {
    pub id: Id,
    #[serde(default)]
    pub text: LocalizedText,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Heading {
    #[serde(default)]
    pub text: LocalizedText,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestionSchema {
    pub id: Id,
    #[serde(default)]
    pub question_number: Value,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub heading: Heading,
    #[serde(default)]
    pub sub_questions: Vec<SubQuestion>,
}

impl QuestionSchema {
    /// 默认语言的题目标题，用于查答案
    pub fn title(&self) -> Option<&str> {
        self.heading.text.get("default")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubQuestion {
    pub id: Id,
    #[serde(default)]
    pub question_number: Value,
    #[serde(default)]
    pub options: SubQuestionOptions,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl SubQuestion {
    pub fn is_reverse_scoring(&self) -> bool {
        self.options.reverse_scoring.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubQuestionOptions {
    #[serde(default)]
    pub reverse_scoring: Option<bool>,
}
