use crate::error::{AppError, AppResult};
use crate::models::answer_key::AnswerKeyStore;
use std::path::Path;
use tokio::fs;

/// 从文件加载答案映射
///
/// 按扩展名选择格式：`.toml` 用 TOML，其余按 JSON 解析。
/// 文件不存在时返回空映射（矩阵题仍可作答，其他题留空）。
pub async fn load_answer_key(path: &Path) -> AppResult<AnswerKeyStore> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        tracing::warn!("⚠️ 答案文件不存在: {}，将不填写单选/多选题", path.display());
        return Ok(AnswerKeyStore::default());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let is_toml = path.extension().and_then(|s| s.to_str()) == Some("toml");
    let store: AnswerKeyStore = if is_toml {
        toml::from_str(&content)
            .map_err(|e| AppError::file_parse_failed(path.display().to_string(), e))?
    } else {
        serde_json::from_str(&content)
            .map_err(|e| AppError::file_parse_failed(path.display().to_string(), e))?
    };

    tracing::debug!("已加载 {} 条答案: {}", store.len(), path.display());
    Ok(store)
}
