use std::collections::HashMap;

use serde::Deserialize;

/// 答案文本：单个字符串或字符串列表
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnswerText {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnswerEntry {
    #[serde(default)]
    pub default: Option<AnswerText>,
    #[serde(default)]
    pub hard: Option<AnswerText>,
}

/// 使用哪一套答案
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerVariant {
    Default,
    Hard,
}

impl AnswerVariant {
    pub fn from_flag(use_hard_answers: bool) -> Self {
        if use_hard_answers {
            AnswerVariant::Hard
        } else {
            AnswerVariant::Default
        }
    }
}

/// 题目标题 → 答案文本 的静态映射
///
/// 查找按标题精确匹配（区分大小写）。查不到时返回空结果，从不报错。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct AnswerKeyStore {
    entries: HashMap<String, AnswerEntry>,
}

impl AnswerKeyStore {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, heading: &str, variant: AnswerVariant) -> Option<&AnswerText> {
        let entry = self.entries.get(heading)?;
        match variant {
            AnswerVariant::Default => entry.default.as_ref(),
            AnswerVariant::Hard => entry.hard.as_ref(),
        }
    }

    /// 单选题的目标文本；值是列表时取第一个
    pub fn single(&self, heading: &str, variant: AnswerVariant) -> Option<&str> {
        match self.lookup(heading, variant)? {
            AnswerText::One(text) => Some(text.as_str()),
            AnswerText::Many(texts) => texts.first().map(String::as_str),
        }
    }

    /// 多选题的目标文本列表；值是字符串时视为单元素列表
    pub fn multiple(&self, heading: &str, variant: AnswerVariant) -> Vec<&str> {
        match self.lookup(heading, variant) {
            Some(AnswerText::One(text)) => vec![text.as_str()],
            Some(AnswerText::Many(texts)) => texts.iter().map(String::as_str).collect(),
            None => Vec::new(),
        }
    }
}
