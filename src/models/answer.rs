use serde::Serialize;
use serde_json::Value;

use crate::models::survey::Id;

/// 提交给平台的一道题的答案
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerPayload {
    pub answer: AnswerValue,
    pub question_id: Id,
    pub question_number: Value,
    pub question_type: String,
    pub score: Option<u32>,
}

/// 普通题是选项 ID 列表，矩阵题是子题答案列表
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Choices(Vec<Id>),
    SubAnswers(Vec<SubAnswer>),
}

impl AnswerValue {
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Choices(ids) => ids.is_empty(),
            AnswerValue::SubAnswers(subs) => subs.is_empty(),
        }
    }
}

/// 矩阵题的子题答案，类型固定为 `single_selection`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubAnswer {
    /// 找不到对应 Likert 选项时为 null
    pub answer: Option<Id>,
    pub question_id: Id,
    pub score: u32,
    pub question_type: &'static str,
    pub question_number: Value,
    pub reverse_scoring: bool,
}
