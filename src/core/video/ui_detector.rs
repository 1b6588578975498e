//! UI 区域检测器 - 灰度 → Canny 边缘 → 外部轮廓 → 包围盒 + 平均色
//!
//! 输出顺序就是轮廓发现顺序，不按位置排序。同一张图、同一组阈值，
//! 结果完全确定。

use crate::core::video::error::VideoError;
use image::RgbImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::edges::canny;
use imageproc::point::Point;
use log::debug;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct UiDetectorConfig {
    pub canny_low: f32,
    pub canny_high: f32,
    /// 包围盒宽度 <= 该值的按噪声丢弃
    pub min_width: u32,
    /// 包围盒高度 <= 该值的按噪声丢弃
    pub min_height: u32,
}

impl Default for UiDetectorConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            min_width: 50,
            min_height: 20,
        }
    }
}

/// 区域内的平均颜色，RGB 通道序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// 一块疑似 UI 的矩形区域，像素坐标，原点左上
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiElement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub color: RegionColor,
}

pub struct UiElementDetector {
    config: UiDetectorConfig,
}

impl UiElementDetector {
    pub fn new() -> Self {
        Self::with_config(UiDetectorConfig::default())
    }

    pub fn with_config(config: UiDetectorConfig) -> Self {
        Self { config }
    }

    /// 检测一帧里的矩形 UI 区域
    ///
    /// 只取外部轮廓，嵌套的内部轮廓忽略；平均色在整个包围盒上算，
    /// 背景像素也计入。
    pub fn detect(&self, image_path: &Path) -> Result<Vec<UiElement>, VideoError> {
        let img = image::open(image_path).map_err(|_| VideoError::frame_decode(image_path))?;
        let rgb = img.to_rgb8();
        let gray = img.to_luma8();

        let edges = canny(&gray, self.config.canny_low, self.config.canny_high);
        let contours = find_contours::<i32>(&edges);

        let mut elements = Vec::new();
        for contour in &contours {
            if contour.border_type != BorderType::Outer {
                continue;
            }
            let Some((x, y, width, height)) = bounding_box(&contour.points) else {
                continue;
            };
            if width <= self.config.min_width || height <= self.config.min_height {
                continue;
            }
            elements.push(UiElement {
                x,
                y,
                width,
                height,
                color: mean_color(&rgb, x, y, width, height),
            });
        }

        debug!("{}: {} ui regions", image_path.display(), elements.len());
        Ok(elements)
    }
}

impl Default for UiElementDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn bounding_box(points: &[Point<i32>]) -> Option<(u32, u32, u32, u32)> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some((
        min_x as u32,
        min_y as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

fn mean_color(rgb: &RgbImage, x: u32, y: u32, width: u32, height: u32) -> RegionColor {
    let (img_w, img_h) = rgb.dimensions();
    let mut sum = [0u64; 3];
    let mut count = 0u64;

    for py in y..(y + height).min(img_h) {
        for px in x..(x + width).min(img_w) {
            let p = rgb.get_pixel(px, py).0;
            sum[0] += p[0] as u64;
            sum[1] += p[1] as u64;
            sum[2] += p[2] as u64;
            count += 1;
        }
    }

    if count == 0 {
        return RegionColor { r: 0, g: 0, b: 0 };
    }
    RegionColor {
        r: (sum[0] / count) as u8,
        g: (sum[1] / count) as u8,
        b: (sum[2] / count) as u8,
    }
}
