//! 答案生成 - 业务能力层
//!
//! 纯函数：题目列表 + 答案映射 + 选项 → 有序的答案列表。
//! 输出与输入一一对应、顺序一致；查不到答案的题目留空，从不报错。

use serde_json::{Map, Value as JsonValue};

use crate::error::AppResult;
use crate::models::{
    AnswerKeyStore, AnswerPayload, AnswerValue, AnswerVariant, Choice, Id, QuestionSchema,
    QuestionType, ResponseRef, SubAnswer,
};

/// 矩阵题按英文标签匹配
const LOCALE_EN: &str = "en_us";
/// 单选/多选题按繁体中文标签匹配
const LOCALE_ZH_TW: &str = "zh_tw";

const WRITE_TIME_MIN: u32 = 30;
const WRITE_TIME_MAX: u32 = 500;

/// 作答选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisOptions {
    pub use_hard_answers: bool,
    pub use_high_score: bool,
}

impl SynthesisOptions {
    fn agree_label(&self, reverse_scoring: bool) -> &'static str {
        match (self.use_high_score, reverse_scoring) {
            (false, false) => "agree",
            (true, false) => "highly agree",
            (false, true) => "disagree",
            (true, true) => "highly disagree",
        }
    }

    fn sub_score(&self) -> u32 {
        if self.use_high_score {
            5
        } else {
            4
        }
    }
}

/// 为每道题生成答案
pub fn synthesize(
    questions: &[QuestionSchema],
    answer_key: &AnswerKeyStore,
    options: SynthesisOptions,
) -> Vec<AnswerPayload> {
    let variant = AnswerVariant::from_flag(options.use_hard_answers);

    questions
        .iter()
        .map(|question| match question.question_type {
            QuestionType::Matrix => matrix_answer(question, options),
            QuestionType::SingleSelection => {
                let ids = question
                    .title()
                    .and_then(|title| answer_key.single(title, variant))
                    .and_then(|target| choice_id_by_text(&question.choices, target, LOCALE_ZH_TW))
                    .cloned()
                    .into_iter()
                    .collect();
                choice_answer(question, ids)
            }
            QuestionType::MultiSelection => {
                let ids = question
                    .title()
                    .map(|title| answer_key.multiple(title, variant))
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|target| {
                        choice_id_by_text(&question.choices, target, LOCALE_ZH_TW).cloned()
                    })
                    .collect();
                choice_answer(question, ids)
            }
            // 简答题不自动填写；未知题型同样留空，保证一题一个答案
            QuestionType::ShortAnswer | QuestionType::Other(_) => choice_answer(question, Vec::new()),
        })
        .collect()
}

fn choice_answer(question: &QuestionSchema, ids: Vec<Id>) -> AnswerPayload {
    AnswerPayload {
        answer: AnswerValue::Choices(ids),
        question_id: question.id.clone(),
        question_number: question.question_number.clone(),
        question_type: question.question_type.as_str().to_string(),
        score: None,
    }
}

/// 矩阵题：每个子题选"同意"（反向计分选"不同意"），总分为子题分数之和
fn matrix_answer(question: &QuestionSchema, options: SynthesisOptions) -> AnswerPayload {
    let sub_answers: Vec<SubAnswer> = question
        .sub_questions
        .iter()
        .map(|sub| {
            let reverse_scoring = sub.is_reverse_scoring();
            // Likert 量表通常挂在父题上
            let choices = if sub.choices.is_empty() {
                &question.choices
            } else {
                &sub.choices
            };
            SubAnswer {
                answer: choice_id_by_text(choices, options.agree_label(reverse_scoring), LOCALE_EN)
                    .cloned(),
                question_id: sub.id.clone(),
                score: options.sub_score(),
                question_type: "single_selection",
                question_number: sub.question_number.clone(),
                reverse_scoring,
            }
        })
        .collect();

    let total = sub_answers.iter().map(|sub| sub.score).sum();

    AnswerPayload {
        answer: AnswerValue::SubAnswers(sub_answers),
        question_id: question.id.clone(),
        question_number: question.question_number.clone(),
        question_type: question.question_type.as_str().to_string(),
        score: Some(total),
    }
}

/// 按某个语言的文本找选项 ID（不区分大小写），取列表中第一个匹配项
pub fn choice_id_by_text<'a>(choices: &'a [Choice], target: &str, lang: &str) -> Option<&'a Id> {
    let target = target.to_lowercase();
    choices
        .iter()
        .find(|choice| {
            choice
                .text
                .get(lang)
                .is_some_and(|text| text.to_lowercase() == target)
        })
        .map(|choice| &choice.id)
}

/// 模拟人工作答时长（秒）
pub fn random_write_time() -> u32 {
    rand::random_range(WRITE_TIME_MIN..=WRITE_TIME_MAX)
}

/// 以 response 记录为底稿组装提交信封
pub fn build_submission(
    response: &ResponseRef,
    answers: Vec<AnswerPayload>,
    write_time: u32,
) -> AppResult<JsonValue> {
    let mut envelope: Map<String, JsonValue> = response.raw.clone();
    envelope.insert("answers".to_string(), serde_json::to_value(answers)?);
    envelope.insert("status".to_string(), JsonValue::from("SUBMITTED"));
    envelope.insert("write_time".to_string(), JsonValue::from(write_time));
    Ok(JsonValue::Object(envelope))
}
