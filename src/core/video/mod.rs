//! 视频关键帧分析管线
//!
//! 核心流程：
//! 1. 场景切换抽帧 - 外部解码器按场景变化输出帧图 + 时间戳
//! 2. 感知去重 - DCT pHash + 汉明距离，贪心在线过滤近重复帧
//! 3. 逐帧分析 - OCR 文字提取 + UI 矩形区域检测，可并行
//! 4. 工作区 - 每次请求独占临时路径，Drop 兜底清理

pub mod deduplicator;
pub mod error;
pub mod extractor;
pub mod ocr;
pub mod pipeline;
pub mod ui_detector;
pub mod workspace;

pub use deduplicator::{DedupConfig, FrameDeduplicator, PerceptualSignature, UniqueFrame};
pub use error::VideoError;
pub use extractor::{ExtractorConfig, RawFrame, SceneChangeExtractor};
pub use ocr::{MockRecognizer, OcrConfig, TesseractRecognizer, TextRecognizer};
pub use pipeline::{CancelToken, FrameResult, PipelineConfig, VideoPipeline};
pub use ui_detector::{RegionColor, UiDetectorConfig, UiElement, UiElementDetector};
pub use workspace::RunWorkspace;
