//! 文字提取适配器 - 把单帧图交给外部 OCR 引擎（tesseract CLI）

use crate::core::video::error::VideoError;
use log::debug;
use std::path::Path;
use std::process::{Command, Stdio};

#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// OCR 引擎可执行文件
    pub binary: String,
    /// 识别语言（None = 引擎默认）
    pub language: Option<String>,
    /// 默认保留引擎输出里的空行
    pub drop_empty_lines: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: None,
            drop_empty_lines: false,
        }
    }
}

/// OCR 引擎的窄接口，方便在测试里替换成 mock
pub trait TextRecognizer: Send + Sync {
    /// 识别一帧里的文字，按引擎的原生换行切成有序行
    ///
    /// 引擎没识别出任何文字是合法的空结果，不是错误。
    fn recognize(&self, image_path: &Path) -> Result<Vec<String>, VideoError>;
}

pub struct TesseractRecognizer {
    config: OcrConfig,
}

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self::with_config(OcrConfig::default())
    }

    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image_path: &Path) -> Result<Vec<String>, VideoError> {
        // 坏帧和引擎故障要区分开：先确认帧图本身可读
        image::open(image_path).map_err(|_| VideoError::frame_decode(image_path))?;

        let mut cmd = Command::new(&self.config.binary);
        cmd.arg(image_path).arg("stdout");
        if let Some(lang) = &self.config.language {
            cmd.arg("-l").arg(lang);
        }

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|e| VideoError::AnalysisFailure(format!("failed to run OCR engine: {e}")))?;

        if !output.status.success() {
            return Err(VideoError::AnalysisFailure(format!(
                "OCR engine exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let lines = split_lines(&text, self.config.drop_empty_lines);
        debug!("{}: {} ocr lines", image_path.display(), lines.len());
        Ok(lines)
    }
}

/// 按引擎原生换行切行；尾部的分页符/换行不算内容
pub(crate) fn split_lines(text: &str, drop_empty: bool) -> Vec<String> {
    text.trim_end_matches(['\u{c}', '\n', '\r'])
        .lines()
        .filter(|line| !(drop_empty && line.trim().is_empty()))
        .map(str::to_string)
        .collect()
}

/// 测试用的假识别器，按路径返回固定文字
pub struct MockRecognizer {
    lines_for: Box<dyn Fn(&Path) -> Vec<String> + Send + Sync>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self::with_pattern(|_| Vec::new())
    }

    pub fn with_lines(lines: Vec<String>) -> Self {
        Self::with_pattern(move |_| lines.clone())
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(&Path) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            lines_for: Box::new(pattern),
        }
    }
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRecognizer for MockRecognizer {
    fn recognize(&self, image_path: &Path) -> Result<Vec<String>, VideoError> {
        Ok((self.lines_for)(image_path))
    }
}
