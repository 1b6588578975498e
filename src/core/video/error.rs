use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("video decode failed: {0}")]
    DecodeFailure(String),
    #[error("frame image unreadable: {path}")]
    FrameDecodeError { path: String },
    #[error("frame analysis failed: {0}")]
    AnalysisFailure(String),
    #[error("failed to persist upload: {0}")]
    UploadPersistError(String),
    #[error("pipeline cancelled")]
    Cancelled,
}

impl VideoError {
    /// 错误信息里只带文件名，不暴露 scratch 目录布局
    pub(crate) fn frame_decode(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        VideoError::FrameDecodeError { path: name }
    }
}
