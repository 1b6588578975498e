//! 单次请求的临时工作区 - 视频文件 + 抽帧目录

use crate::core::video::error::VideoError;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// 进程内单调递增，同一毫秒内的并发请求也不会撞名
static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 一次处理请求独占的临时文件系统状态
///
/// 视频文件和抽帧目录都挂在这个句柄的生命周期上，`Drop` 时统一释放，
/// 成功、失败、panic 都不会留残留。
pub struct RunWorkspace {
    video_path: PathBuf,
    frames_dir: PathBuf,
}

impl RunWorkspace {
    /// 在 scratch_root 下分配本次请求的视频路径和抽帧目录
    ///
    /// 命名：`<millis>-<seq>_<filename>` / `frames_<millis>-<seq>_<stem>`
    pub fn allocate(scratch_root: &Path, original_filename: &str) -> Result<Self, VideoError> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let seq = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tag = format!("{millis}-{seq}");

        let name = sanitize_filename(original_filename);
        let stem = Path::new(&name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.clone());

        let video_path = scratch_root.join(format!("{tag}_{name}"));
        let frames_dir = scratch_root.join(format!("frames_{tag}_{stem}"));
        fs::create_dir_all(&frames_dir)?;

        Ok(Self {
            video_path,
            frames_dir,
        })
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }

    /// 把上传的视频字节落盘
    pub fn persist_upload(&self, bytes: &[u8]) -> Result<(), VideoError> {
        fs::write(&self.video_path, bytes)
            .map_err(|e| VideoError::UploadPersistError(e.to_string()))
    }

    /// 释放全部临时状态，可重复调用（路径不存在时直接跳过）
    pub fn cleanup(&self) {
        if self.frames_dir.exists() {
            match fs::remove_dir_all(&self.frames_dir) {
                Ok(()) => info!("🧹 cleaned up frames dir: {}", self.frames_dir.display()),
                Err(e) => warn!(
                    "failed to remove frames dir {}: {}",
                    self.frames_dir.display(),
                    e
                ),
            }
        }
        if self.video_path.exists() {
            match fs::remove_file(&self.video_path) {
                Ok(()) => info!("🧹 deleted temp video file: {}", self.video_path.display()),
                Err(e) => warn!(
                    "failed to remove temp video {}: {}",
                    self.video_path.display(),
                    e
                ),
            }
        }
    }
}

impl Drop for RunWorkspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// 去掉路径分隔符，只保留上传文件名本身
fn sanitize_filename(original: &str) -> String {
    let name = original.replace(['/', '\\'], "_");
    if name.is_empty() {
        "video".to_string()
    } else {
        name
    }
}
