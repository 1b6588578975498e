//! 感知哈希去重器 - 对场景抽帧结果做贪心在线去重
//!
//! 签名用 DCT 感知哈希（默认 16x16 = 256 位）：缩放到 64x64 灰度，
//! 做二维 DCT-II，取左上低频块，按中位数二值化。视觉相似的帧
//! 汉明距离小，低于阈值的直接删掉帧文件。

use crate::core::video::error::VideoError;
use crate::core::video::extractor::RawFrame;
use image::imageops::FilterType;
use image::DynamicImage;
use log::debug;
use rustdct::{DctPlanner, TransformType2And3};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// 签名边长，位数 = hash_size²；越大误合并越少，算得越慢
    pub hash_size: u32,
    /// 汉明距离低于该值视为重复帧
    pub distance_threshold: u32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            hash_size: 16,
            distance_threshold: 5,
        }
    }
}

/// 定长位指纹，只在去重阶段存在
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerceptualSignature {
    bits: Vec<u64>,
}

impl PerceptualSignature {
    pub fn distance(&self, other: &PerceptualSignature) -> u32 {
        self.bits
            .iter()
            .zip(&other.bits)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

/// 去重后的幸存帧，底层文件归本次请求的工作区所有
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueFrame {
    pub path: PathBuf,
    pub timestamp_secs: Option<f64>,
}

pub struct FrameDeduplicator {
    config: DedupConfig,
}

impl FrameDeduplicator {
    pub fn new() -> Self {
        Self::with_config(DedupConfig::default())
    }

    pub fn with_config(config: DedupConfig) -> Self {
        Self { config }
    }

    pub fn with_threshold(distance_threshold: u32) -> Self {
        Self::with_config(DedupConfig {
            distance_threshold,
            ..Default::default()
        })
    }

    /// 贪心在线去重：逐帧与所有已接受签名比较，最小距离 >= 阈值才保留
    ///
    /// 重复帧的文件立即删除。帧图解不出来直接报 `FrameDecodeError`，
    /// 不能静默跳过 —— 跳过会让时间戳和帧错位。
    pub fn dedup(&self, frames: Vec<RawFrame>) -> Result<Vec<UniqueFrame>, VideoError> {
        let mut accepted: Vec<PerceptualSignature> = Vec::new();
        let mut unique = Vec::new();

        for frame in frames {
            let img = image::open(&frame.path)
                .map_err(|_| VideoError::frame_decode(&frame.path))?;
            let sig = self.signature(&img);

            if is_near_duplicate(&sig, &accepted, self.config.distance_threshold) {
                debug!("dropping near-duplicate frame {}", frame.path.display());
                fs::remove_file(&frame.path)?;
            } else {
                accepted.push(sig);
                unique.push(UniqueFrame {
                    path: frame.path,
                    timestamp_secs: frame.timestamp_secs,
                });
            }
        }

        Ok(unique)
    }

    /// 计算一帧的 DCT 感知哈希
    pub fn signature(&self, img: &DynamicImage) -> PerceptualSignature {
        let hash_size = self.config.hash_size as usize;
        let img_size = hash_size * 4;

        let gray = img
            .resize_exact(img_size as u32, img_size as u32, FilterType::Triangle)
            .to_luma8();
        let mut matrix: Vec<f32> = gray.pixels().map(|p| p.0[0] as f32).collect();

        let mut planner = DctPlanner::<f32>::new();
        let dct: Arc<dyn TransformType2And3<f32>> = planner.plan_dct2(img_size);

        // 先行后列的二维 DCT（转置后低频块仍在左上角）
        for row in matrix.chunks_exact_mut(img_size) {
            dct.process_dct2(row);
        }
        let mut transposed = transpose(&matrix, img_size);
        for row in transposed.chunks_exact_mut(img_size) {
            dct.process_dct2(row);
        }

        let mut block = Vec::with_capacity(hash_size * hash_size);
        for u in 0..hash_size {
            for v in 0..hash_size {
                block.push(transposed[u * img_size + v]);
            }
        }

        let median = median_of(&block);
        let mut bits = vec![0u64; (block.len() + 63) / 64];
        for (i, &coeff) in block.iter().enumerate() {
            if coeff > median {
                bits[i / 64] |= 1 << (i % 64);
            }
        }

        PerceptualSignature { bits }
    }
}

impl Default for FrameDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}

fn is_near_duplicate(
    sig: &PerceptualSignature,
    accepted: &[PerceptualSignature],
    threshold: u32,
) -> bool {
    accepted.iter().any(|seen| sig.distance(seen) < threshold)
}

fn transpose(matrix: &[f32], size: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; matrix.len()];
    for r in 0..size {
        for c in 0..size {
            out[c * size + r] = matrix[r * size + c];
        }
    }
    out
}

fn median_of(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "framesift-dedup-{}-{}",
            std::process::id(),
            name
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn checkerboard(w: u32, h: u32, cell: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    fn horizontal_gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, _| {
            let v = (x * 255 / w.max(1)) as u8;
            Rgb([v, v, v])
        })
    }

    fn bright_quadrant(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            if x < w / 2 && y < h / 2 {
                Rgb([230, 230, 230])
            } else {
                Rgb([20, 20, 20])
            }
        })
    }

    fn write_frame(dir: &Path, index: usize, img: &RgbImage) -> RawFrame {
        let path = dir.join(format!("frame-{:04}.png", index + 1));
        img.save(&path).unwrap();
        RawFrame {
            path,
            sequence_index: index,
            timestamp_secs: Some(index as f64),
        }
    }

    fn sig(bits: Vec<u64>) -> PerceptualSignature {
        PerceptualSignature { bits }
    }

    #[test]
    fn test_identical_images_have_zero_distance() {
        let dedup = FrameDeduplicator::new();
        let img = DynamicImage::ImageRgb8(checkerboard(128, 128, 16));
        let a = dedup.signature(&img);
        let b = dedup.signature(&img);
        assert_eq!(a.distance(&b), 0);
    }

    #[test]
    fn test_structurally_different_images_are_far_apart() {
        let dedup = FrameDeduplicator::new();
        let a = dedup.signature(&DynamicImage::ImageRgb8(checkerboard(128, 128, 8)));
        let b = dedup.signature(&DynamicImage::ImageRgb8(horizontal_gradient(128, 128)));
        assert!(a.distance(&b) >= 5, "distance was {}", a.distance(&b));
    }

    #[test]
    fn test_consecutive_identical_frames_keep_only_first() {
        let dir = test_dir("identical");
        let dedup = FrameDeduplicator::new();

        let img = checkerboard(160, 120, 10);
        let frames = vec![write_frame(&dir, 0, &img), write_frame(&dir, 1, &img)];
        let dup_path = frames[1].path.clone();

        let unique = dedup.dedup(frames).unwrap();

        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].timestamp_secs, Some(0.0));
        assert!(unique[0].path.exists());
        // 重复帧的文件要被立刻删除
        assert!(!dup_path.exists());
    }

    #[test]
    fn test_distinct_frames_all_survive_in_order() {
        let dir = test_dir("distinct");
        let dedup = FrameDeduplicator::new();

        let frames = vec![
            write_frame(&dir, 0, &checkerboard(160, 120, 8)),
            write_frame(&dir, 1, &horizontal_gradient(160, 120)),
            write_frame(&dir, 2, &bright_quadrant(160, 120)),
        ];

        let unique = dedup.dedup(frames).unwrap();

        assert_eq!(unique.len(), 3);
        let times: Vec<_> = unique.iter().map(|f| f.timestamp_secs).collect();
        assert_eq!(times, vec![Some(0.0), Some(1.0), Some(2.0)]);
        for frame in &unique {
            assert!(frame.path.exists());
        }
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let dir = test_dir("idempotent");
        let dedup = FrameDeduplicator::new();

        let frames = vec![
            write_frame(&dir, 0, &checkerboard(160, 120, 8)),
            write_frame(&dir, 1, &horizontal_gradient(160, 120)),
        ];

        let first = dedup.dedup(frames).unwrap();
        let again: Vec<RawFrame> = first
            .iter()
            .enumerate()
            .map(|(i, f)| RawFrame {
                path: f.path.clone(),
                sequence_index: i,
                timestamp_secs: f.timestamp_secs,
            })
            .collect();
        let second = dedup.dedup(again).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_unreadable_frame_is_a_typed_failure() {
        let dir = test_dir("corrupt");
        let dedup = FrameDeduplicator::new();

        let path = dir.join("frame-0001.png");
        fs::write(&path, b"this is not a png").unwrap();
        let frames = vec![RawFrame {
            path,
            sequence_index: 0,
            timestamp_secs: Some(0.0),
        }];

        let err = dedup.dedup(frames).unwrap_err();
        match err {
            VideoError::FrameDecodeError { path } => assert_eq!(path, "frame-0001.png"),
            other => panic!("expected FrameDecodeError, got {other:?}"),
        }
    }

    #[test]
    fn test_raising_threshold_never_keeps_more_frames() {
        // 手工构造已知距离的签名，绕开图像内容的偶然性
        let sigs = vec![
            sig(vec![0b0000_0000]),
            sig(vec![0b0000_0011]),
            sig(vec![0b0011_1111]),
            sig(vec![0b1111_1111]),
        ];

        let accepted_count = |threshold: u32| {
            let mut accepted: Vec<PerceptualSignature> = Vec::new();
            for s in &sigs {
                if !is_near_duplicate(s, &accepted, threshold) {
                    accepted.push(s.clone());
                }
            }
            accepted.len()
        };

        let thresholds = [0u32, 1, 2, 3, 4, 6, 8, 100];
        let counts: Vec<usize> = thresholds.iter().map(|&t| accepted_count(t)).collect();

        for pair in counts.windows(2) {
            assert!(pair[1] <= pair[0], "counts not monotone: {counts:?}");
        }
        assert_eq!(counts[0], 4); // 阈值 0：全保留
        assert_eq!(*counts.last().unwrap(), 1); // 阈值极大：只剩第一帧
    }
}
