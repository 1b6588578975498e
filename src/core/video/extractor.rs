//! 场景切换抽帧器 - 调用外部解码器（ffmpeg），每次场景变化输出一张图
//!
//! 时间戳从解码器的 stderr 日志里按 `pts_time:` 逐行恢复，
//! 按位置与帧文件一一对应（第 i 个时间戳 ↔ 第 i 帧）。

use crate::core::video::error::VideoError;
use crate::core::video::pipeline::CancelToken;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

static PTS_TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"pts_time:(\d+\.\d+)").unwrap());

/// 解码器诊断文本太长时只保留尾部（错误现场都在最后）
const MAX_DIAGNOSTIC_LEN: usize = 4000;

/// 轮询子进程退出状态的间隔
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// 解码器可执行文件
    pub ffmpeg_path: String,
    /// 场景切换灵敏度，0.3 ≈ 明显的画面变化
    pub scene_threshold: f32,
    /// 输出帧统一缩放到的宽度（高度按比例）
    pub scale_width: u32,
    /// 解码超时，超过后强杀子进程
    pub decode_timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            scene_threshold: 0.3,
            scale_width: 1280,
            decode_timeout: Duration::from_secs(120),
        }
    }
}

/// 一次抽帧得到的单帧：文件路径 + 解码顺序 + 展示时间戳
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub path: PathBuf,
    pub sequence_index: usize,
    /// 解码器时间戳少于帧数时，对不上的帧为 None
    pub timestamp_secs: Option<f64>,
}

pub struct SceneChangeExtractor {
    config: ExtractorConfig,
}

impl SceneChangeExtractor {
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::default())
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// 对视频做场景切换抽帧，帧图写入 frames_dir，返回按序的 RawFrame
    ///
    /// 解码器非零退出或无法启动时返回 `DecodeFailure`，不产出部分结果。
    pub fn extract(
        &self,
        video_path: &Path,
        frames_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<Vec<RawFrame>, VideoError> {
        if !frames_dir.exists() {
            fs::create_dir(frames_dir)?;
        }

        let filter = format!(
            "select=gt(scene\\,{}),scale={}:-1,showinfo",
            self.config.scene_threshold, self.config.scale_width
        );
        let output_pattern = frames_dir.join("frame-%04d.png");

        info!("extracting scene-change frames from {}", video_path.display());

        let mut child = Command::new(&self.config.ffmpeg_path)
            .arg("-i")
            .arg(video_path)
            .arg("-vf")
            .arg(&filter)
            .arg("-vsync")
            .arg("vfr")
            .arg(&output_pattern)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VideoError::DecodeFailure(format!("failed to start decoder: {e}")))?;

        let Some(mut stderr_pipe) = child.stderr.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(VideoError::DecodeFailure(
                "decoder stderr unavailable".to_string(),
            ));
        };

        // stderr 在独立线程上读，防止解码器写满管道后卡死
        let reader = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr_pipe.read_to_string(&mut buf);
            buf
        });

        let deadline = Instant::now() + self.config.decode_timeout;
        let status = loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VideoError::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(VideoError::DecodeFailure(format!(
                            "decoder timed out after {:?}",
                            self.config.decode_timeout
                        )));
                    }
                    thread::sleep(WAIT_POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(VideoError::DecodeFailure(format!(
                        "failed to wait for decoder: {e}"
                    )));
                }
            }
        };

        let diagnostics = reader.join().unwrap_or_default();

        if !status.success() {
            return Err(VideoError::DecodeFailure(tail(&diagnostics, MAX_DIAGNOSTIC_LEN)));
        }

        let timestamps = parse_timestamps(&diagnostics);
        debug!("decoder reported {} pts_time markers", timestamps.len());

        collect_frames(frames_dir, &timestamps)
    }
}

impl Default for SceneChangeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// 从解码器 stderr 里按行抓 pts_time（每行最多取一个）
fn parse_timestamps(stderr: &str) -> Vec<f64> {
    stderr
        .lines()
        .filter_map(|line| PTS_TIME_RE.captures(line))
        .filter_map(|caps| caps[1].parse::<f64>().ok())
        .collect()
}

/// 列出输出目录里的帧图（文件名编码了序号，字典序即时间序），
/// 按位置配上时间戳
fn collect_frames(frames_dir: &Path, timestamps: &[f64]) -> Result<Vec<RawFrame>, VideoError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(frames_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("png"))
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(idx, path)| RawFrame {
            path,
            sequence_index: idx,
            timestamp_secs: timestamps.get(idx).copied(),
        })
        .collect())
}

fn tail(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut start = text.len() - max_len;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
