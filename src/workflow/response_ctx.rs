//! 问卷处理上下文
//!
//! 封装"我正在处理第几份问卷、哪个 response"这一信息

use std::fmt::Display;

use crate::models::{AnswerableResponse, Id};

#[derive(Debug, Clone)]
pub struct ResponseCtx {
    /// 问卷索引（仅用于日志显示，从 1 开始）
    pub index: usize,

    pub response_id: Id,

    pub survey_id: Id,

    /// 评价对象名称（课程 / 教师）
    pub name: String,
}

impl ResponseCtx {
    pub fn new(index: usize, target: &AnswerableResponse) -> Self {
        Self {
            index,
            response_id: target.response.id.clone(),
            survey_id: target.response.survey_id.clone(),
            name: target.name.clone(),
        }
    }
}

impl Display for ResponseCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[问卷 {} | {} | response#{}]",
            self.index, self.name, self.response_id
        )
    }
}
