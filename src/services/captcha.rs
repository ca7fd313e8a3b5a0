//! 验证码识别服务 - 业务能力层
//!
//! OCR 引擎本身是黑盒：图片字节进，文本出。这里只负责解开 data URI。

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::CaptchaChallenge;

/// `data:image/png;base64,` 的长度
const DATA_URI_PREFIX_LEN: usize = 22;

/// 图片分类器：把验证码图片识别成文本
pub trait OcrClassifier {
    fn classify(&self, image: &[u8]) -> AppResult<String>;
}

/// 验证码求解器
///
/// 不做重试：识别错误会在登录提交时被身份提供者拒绝，表现为登录失败。
pub struct CaptchaSolver<C> {
    classifier: C,
}

impl<C: OcrClassifier> CaptchaSolver<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    pub fn solve(&self, challenge: &CaptchaChallenge) -> AppResult<String> {
        let bytes = decode_image(&challenge.image)?;
        debug!("验证码图片 {} 字节", bytes.len());
        let text = self.classifier.classify(&bytes)?;
        Ok(text.trim().to_string())
    }
}

/// 去掉固定长度的 data URI 前缀后做 base64 解码
pub fn decode_image(image: &str) -> AppResult<Vec<u8>> {
    let payload = image
        .get(DATA_URI_PREFIX_LEN..)
        .ok_or_else(|| AppError::Other(format!("验证码图片格式不正确: {}", image)))?;
    STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::Other(format!("验证码图片 base64 解码失败: {}", e)))
}

/// 人工识别：把图片写到文件，从标准输入读取答案
pub struct ManualClassifier {
    image_path: PathBuf,
}

impl ManualClassifier {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
        }
    }
}

impl OcrClassifier for ManualClassifier {
    fn classify(&self, image: &[u8]) -> AppResult<String> {
        std::fs::write(&self.image_path, image)?;
        info!("🖼️ 验证码已保存至: {}", self.image_path.display());

        print!("请输入验证码: ");
        io::stdout().flush()?;

        // 阻塞读 stdin，需要多线程运行时
        tokio::task::block_in_place(|| read_code(io::stdin().lock()))
    }
}

/// 读取一行输入作为验证码
fn read_code<R: BufRead>(mut reader: R) -> AppResult<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoClassifier;

    impl OcrClassifier for EchoClassifier {
        fn classify(&self, image: &[u8]) -> AppResult<String> {
            Ok(format!(" {} ", String::from_utf8_lossy(image)))
        }
    }

    fn challenge(payload: &[u8]) -> CaptchaChallenge {
        CaptchaChallenge {
            image: format!("data:image/png;base64,{}", STANDARD.encode(payload)),
            key: "k-1".to_string(),
        }
    }

    #[test]
    fn strips_prefix_and_decodes_before_classifying() {
        let solver = CaptchaSolver::new(EchoClassifier);
        let text = solver.solve(&challenge(b"x7k2")).unwrap();
        assert_eq!(text, "x7k2");
    }

    #[test]
    fn too_short_image_is_an_error() {
        let solver = CaptchaSolver::new(EchoClassifier);
        let bad = CaptchaChallenge {
            image: "data:".to_string(),
            key: "k".to_string(),
        };
        assert!(solver.solve(&bad).is_err());
    }

    #[test]
    fn typed_code_is_trimmed() {
        let code = read_code(io::Cursor::new("  ab12 \r\nextra\n")).unwrap();
        assert_eq!(code, "ab12");
    }

    #[test]
    fn invalid_base64_is_an_error() {
        let bad = "data:image/png;base64,@@@not-base64@@@";
        assert!(decode_image(bad).is_err());
    }
}
