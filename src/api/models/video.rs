use crate::core::video::{FrameResult, RegionColor, UiElement};
use serde::{Deserialize, Serialize};

/// 一次处理请求的响应体：`{ "results": [...] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessFramesResponse {
    pub results: Vec<FrameResultModel>,
}

/// 单帧结果的线上形态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameResultModel {
    /// 帧在原视频里的展示时间（秒），对不上时间戳时为 null
    pub time: Option<f64>,
    #[serde(rename = "ocrText")]
    pub ocr_text: Vec<String>,
    #[serde(rename = "uiBoxes")]
    pub ui_boxes: Vec<UiBoxModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiBoxModel {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub color: ColorModel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorModel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl From<Vec<FrameResult>> for ProcessFramesResponse {
    fn from(results: Vec<FrameResult>) -> Self {
        Self {
            results: results.into_iter().map(FrameResultModel::from).collect(),
        }
    }
}

impl From<FrameResult> for FrameResultModel {
    fn from(result: FrameResult) -> Self {
        Self {
            time: result.timestamp_secs,
            ocr_text: result.ocr_text,
            ui_boxes: result.ui_elements.into_iter().map(UiBoxModel::from).collect(),
        }
    }
}

impl From<UiElement> for UiBoxModel {
    fn from(el: UiElement) -> Self {
        Self {
            x: el.x,
            y: el.y,
            width: el.width,
            height: el.height,
            color: ColorModel::from(el.color),
        }
    }
}

impl From<RegionColor> for ColorModel {
    fn from(color: RegionColor) -> Self {
        Self {
            r: color.r,
            g: color.g,
            b: color.b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_result_wire_shape() {
        let result = FrameResult {
            timestamp_secs: Some(2.5),
            ocr_text: vec!["hello".to_string(), "".to_string()],
            ui_elements: vec![UiElement {
                x: 10,
                y: 20,
                width: 120,
                height: 40,
                color: RegionColor { r: 200, g: 10, b: 30 },
            }],
        };

        let value = serde_json::to_value(FrameResultModel::from(result)).unwrap();
        assert_eq!(
            value,
            json!({
                "time": 2.5,
                "ocrText": ["hello", ""],
                "uiBoxes": [
                    { "x": 10, "y": 20, "width": 120, "height": 40,
                      "color": { "r": 200, "g": 10, "b": 30 } }
                ]
            })
        );
    }

    #[test]
    fn test_missing_timestamp_serializes_as_null() {
        let result = FrameResult {
            timestamp_secs: None,
            ocr_text: vec![],
            ui_elements: vec![],
        };

        let value = serde_json::to_value(FrameResultModel::from(result)).unwrap();
        assert_eq!(value, json!({ "time": null, "ocrText": [], "uiBoxes": [] }));
    }

    #[test]
    fn test_response_wraps_results_array() {
        let response = ProcessFramesResponse::from(Vec::new());
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value, json!({ "results": [] }));
    }
}
