//! Object detections and decoding of the detector's flat output buffer.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::CounterError;
use crate::geometry::Rect;

/// 1検出あたりの値の数 (class_id, score, xmin, xmax, ymin, ymax)
pub const VALUES_PER_DETECTION: usize = 6;

/// ラベル付きの検出BBox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub score: f32,
    pub rect: Rect,
}

impl Detection {
    pub fn new(label: impl Into<String>, score: f32, rect: Rect) -> Self {
        Self {
            label: label.into(),
            score,
            rect,
        }
    }
}

/// クラスID → ラベル名
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// 1行1ラベルのテキストファイルを読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read label file {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let labels = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self { labels }
    }

    /// 未知のIDは10進文字列
    pub fn label(&self, class_id: i32) -> String {
        usize::try_from(class_id)
            .ok()
            .and_then(|i| self.labels.get(i))
            .cloned()
            .unwrap_or_else(|| class_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// カメラフレーム座標 → 表示座標
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale_x: f32,
    pub scale_y: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl ViewTransform {
    pub fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// フレームサイズと表示領域から作成
    pub fn from_sizes(frame: (f32, f32), view: (f32, f32), offset: (f32, f32)) -> Self {
        Self {
            scale_x: view.0 / frame.0,
            scale_y: view.1 / frame.1,
            offset_x: offset.0,
            offset_y: offset.1,
        }
    }

    fn x(&self, x: f32) -> f32 {
        self.offset_x + x * self.scale_x
    }

    fn y(&self, y: f32) -> f32 {
        self.offset_y + y * self.scale_y
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// 検出器のフラットな出力をデコード
///
/// スコアによる絞り込みはしない（被写体トラッカー側で行う）。
pub fn decode_detections(
    raw: &[f32],
    labels: &LabelMap,
    transform: &ViewTransform,
) -> Result<Vec<Detection>, CounterError> {
    if raw.len() % VALUES_PER_DETECTION != 0 {
        return Err(CounterError::MalformedDetections { len: raw.len() });
    }

    Ok(raw
        .chunks_exact(VALUES_PER_DETECTION)
        .map(|d| {
            let class_id = d[0] as i32;
            let rect = Rect::from_edges(
                transform.x(d[2]),
                transform.x(d[3]),
                transform.y(d[4]),
                transform.y(d[5]),
            );
            Detection::new(labels.label(class_id), d[1], rect)
        })
        .collect())
}
