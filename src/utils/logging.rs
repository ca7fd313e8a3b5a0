/// 日志工具模块
///
/// 提供日志格式化、运行报告文件的辅助函数
use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;

use crate::config::Config;
use crate::orchestrator::SurveyOutcome;

/// 初始化报告文件
///
/// # 参数
/// - `log_file_path`: 报告文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n问卷填写日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 追加一份问卷的结果
pub fn append_outcome(log_file_path: &str, outcome: &SurveyOutcome) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    let line = format!(
        "[{}] {} | response#{} | {}\n",
        chrono::Local::now().format("%H:%M:%S"),
        if outcome.submitted { "成功" } else { "失败" },
        outcome.response_id,
        truncate_text(&outcome.name, 40)
    );
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 问卷自动填写");
    info!("👤 账号: {}", config.account);
    info!(
        "📝 答案: {} | 矩阵题: {}",
        if config.use_hard_answers { "hard" } else { "default" },
        if config.use_high_score { "最高分" } else { "同意" }
    );
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 总数
/// - `log_file_path`: 报告文件路径
pub fn print_final_stats(success: usize, failed: usize, total: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Id;

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_text("通识教育课程", 4), "通识教育...");
        assert_eq!(truncate_text("短", 4), "短");
    }

    #[test]
    fn report_file_collects_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let path = path.to_string_lossy().to_string();

        init_log_file(&path).unwrap();
        append_outcome(
            &path,
            &SurveyOutcome {
                response_id: Id::from(501),
                name: "微积分".to_string(),
                submitted: true,
            },
        )
        .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("问卷填写日志"));
        assert!(content.contains("成功 | response#501 | 微积分"));
    }
}
