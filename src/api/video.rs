//! 视频帧分析器 - 上传视频 → 关键帧 → OCR 文字 + UI 区域

use crate::api::models::video::ProcessFramesResponse;
use crate::core::video::{CancelToken, PipelineConfig, VideoError, VideoPipeline};
use log::{error, info};

/// 视频帧分析器 - 场景抽帧 + 感知去重 + 逐帧分析
///
/// 宿主服务收到视频上传后调用 `process_frames`，把返回值直接序列化
/// 成响应体；任何失败都是单个 `VideoError`，映射成 4xx 即可。
///
/// ```no_run
/// use framesift::api::video::VideoFrameAnalyzer;
///
/// let analyzer = VideoFrameAnalyzer::create();
/// let bytes = std::fs::read("clip.mp4").unwrap();
/// let response = analyzer.process_frames(bytes, "clip.mp4".to_string()).unwrap();
/// println!("{} key frames", response.results.len());
/// ```
pub struct VideoFrameAnalyzer {
    pipeline: VideoPipeline,
}

impl VideoFrameAnalyzer {
    /// 用默认配置创建分析器
    pub fn create() -> Self {
        info!("🎬 VideoFrameAnalyzer: created");
        Self {
            pipeline: VideoPipeline::new(),
        }
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        info!("🎬 VideoFrameAnalyzer: created with custom config");
        Self {
            pipeline: VideoPipeline::with_config(config),
        }
    }

    /// 处理一段上传的视频，返回逐关键帧的分析结果
    pub fn process_frames(
        &self,
        video: Vec<u8>,
        filename: String,
    ) -> Result<ProcessFramesResponse, VideoError> {
        match self.pipeline.process(&video, &filename) {
            Ok(results) => Ok(ProcessFramesResponse::from(results)),
            Err(e) => {
                error!("failed to process frames: {e}");
                Err(e)
            }
        }
    }

    /// 带取消标记的版本；请求被取消时返回 `Cancelled`，不产出部分结果
    pub fn process_frames_cancellable(
        &self,
        video: Vec<u8>,
        filename: String,
        cancel: &CancelToken,
    ) -> Result<ProcessFramesResponse, VideoError> {
        match self.pipeline.process_cancellable(&video, &filename, cancel) {
            Ok(results) => Ok(ProcessFramesResponse::from(results)),
            Err(e) => {
                error!("failed to process frames: {e}");
                Err(e)
            }
        }
    }
}
