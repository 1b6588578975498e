//! 管线编排器 - 上传字节 → 临时工作区 → 抽帧 → 去重 → 逐帧分析
//!
//! 阶段之间严格串行；逐帧分析（OCR + UI 检测）之间没有数据依赖，
//! 用 rayon 并行跑，结果按原始序号收集，输出顺序始终是时间序。

use crate::core::video::deduplicator::{DedupConfig, FrameDeduplicator, UniqueFrame};
use crate::core::video::error::VideoError;
use crate::core::video::extractor::{ExtractorConfig, SceneChangeExtractor};
use crate::core::video::ocr::{OcrConfig, TesseractRecognizer, TextRecognizer};
use crate::core::video::ui_detector::{UiDetectorConfig, UiElement, UiElementDetector};
use crate::core::video::workspace::RunWorkspace;
use log::{debug, info};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 跨线程共享的取消标记，取消后管线在下一个检查点停下
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// 单个幸存帧的完整分析结果
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub timestamp_secs: Option<f64>,
    pub ocr_text: Vec<String>,
    pub ui_elements: Vec<UiElement>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 临时文件根目录，每次请求在下面分配独占路径
    pub scratch_dir: PathBuf,
    pub extractor: ExtractorConfig,
    pub dedup: DedupConfig,
    pub ocr: OcrConfig,
    pub ui: UiDetectorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
            extractor: ExtractorConfig::default(),
            dedup: DedupConfig::default(),
            ocr: OcrConfig::default(),
            ui: UiDetectorConfig::default(),
        }
    }
}

pub struct VideoPipeline {
    scratch_dir: PathBuf,
    extractor: SceneChangeExtractor,
    deduplicator: FrameDeduplicator,
    recognizer: Box<dyn TextRecognizer>,
    ui_detector: UiElementDetector,
}

impl VideoPipeline {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            scratch_dir: config.scratch_dir,
            extractor: SceneChangeExtractor::with_config(config.extractor),
            deduplicator: FrameDeduplicator::with_config(config.dedup),
            recognizer: Box::new(TesseractRecognizer::with_config(config.ocr)),
            ui_detector: UiElementDetector::with_config(config.ui),
        }
    }

    /// 换掉 OCR 引擎实现（测试或宿主自带引擎时用）
    pub fn with_recognizer(mut self, recognizer: Box<dyn TextRecognizer>) -> Self {
        self.recognizer = recognizer;
        self
    }

    pub fn process(
        &self,
        video: &[u8],
        original_filename: &str,
    ) -> Result<Vec<FrameResult>, VideoError> {
        self.process_cancellable(video, original_filename, &CancelToken::new())
    }

    /// 端到端跑完整条管线
    ///
    /// 任一阶段失败立刻中止后续阶段，只往外报一个错误；
    /// 工作区挂在栈上，所有退出路径（包括取消和 panic）都会清理干净。
    pub fn process_cancellable(
        &self,
        video: &[u8],
        original_filename: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<FrameResult>, VideoError> {
        info!(
            "processing video frames start: {} ({} bytes)",
            original_filename,
            video.len()
        );

        let workspace = RunWorkspace::allocate(&self.scratch_dir, original_filename)?;
        workspace.persist_upload(video)?;
        ensure_not_cancelled(cancel)?;

        let raw_frames =
            self.extractor
                .extract(workspace.video_path(), workspace.frames_dir(), cancel)?;
        debug!("decoder emitted {} scene-change frames", raw_frames.len());
        ensure_not_cancelled(cancel)?;

        let unique = self.deduplicator.dedup(raw_frames)?;
        info!("{} unique frames after perceptual dedup", unique.len());
        ensure_not_cancelled(cancel)?;

        let results = self.analyze_frames(&unique, cancel)?;
        info!("✓ pipeline complete: {} frame results", results.len());
        Ok(results)
    }

    /// 逐帧分析：每帧先 OCR 再 UI 检测，两者都齐了才算出一条结果
    ///
    /// par_iter + collect 按原始下标归位，完成顺序不影响输出顺序；
    /// 任何一帧出错整批失败，不会悄悄丢掉某帧的部分结果。
    fn analyze_frames(
        &self,
        frames: &[UniqueFrame],
        cancel: &CancelToken,
    ) -> Result<Vec<FrameResult>, VideoError> {
        let recognizer = self.recognizer.as_ref();
        let ui_detector = &self.ui_detector;

        frames
            .par_iter()
            .map(|frame| {
                if cancel.is_cancelled() {
                    return Err(VideoError::Cancelled);
                }
                let ocr_text = recognizer.recognize(&frame.path)?;
                let ui_elements = ui_detector.detect(&frame.path)?;
                Ok(FrameResult {
                    timestamp_secs: frame.timestamp_secs,
                    ocr_text,
                    ui_elements,
                })
            })
            .collect()
    }
}

impl Default for VideoPipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_not_cancelled(cancel: &CancelToken) -> Result<(), VideoError> {
    if cancel.is_cancelled() {
        Err(VideoError::Cancelled)
    } else {
        Ok(())
    }
}
