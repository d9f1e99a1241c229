//! 検出結果の型定義
//!
//! - RawDetection: 検出器が返す生の出力（浮動小数点座標）
//! - Detection: 整数座標に変換済みの検出結果
//! - BBox: 画素座標の矩形 (xmin, ymin, xmax, ymax)

use serde::{Deserialize, Serialize};

/// 画素座標のバウンディングボックス
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BBox {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

impl BBox {
    pub fn new(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    /// xmin < xmax かつ ymin < ymax
    pub fn is_valid(&self) -> bool {
        self.xmin < self.xmax && self.ymin < self.ymax
    }
}

impl std::fmt::Display for BBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

/// 検出結果（ラベル・矩形・信頼度）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub bbox: BBox,
    pub confidence: f32,
}

impl Detection {
    /// 一覧表示用の文字列 `"LABEL (0.93)"`
    pub fn list_entry(&self) -> String {
        format!("{} ({:.2})", self.label, self.confidence)
    }
}

/// 検出器の生出力
///
/// ラベルは `label` があればそれを使い、なければクラス名テーブルを
/// `class_id` で引く。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDetection {
    #[serde(alias = "cls", alias = "class")]
    pub class_id: Option<usize>,
    #[serde(alias = "name")]
    pub label: Option<String>,
    #[serde(alias = "bbox", alias = "box")]
    pub xyxy: [f32; 4],
    #[serde(alias = "conf", alias = "score")]
    pub confidence: f32,
}

impl RawDetection {
    /// 整数座標の `Detection` へ変換
    ///
    /// 座標は0方向へ切り捨ててから画像範囲 `[0, width-1] x [0, height-1]` に
    /// 収める。変換後に幅か高さが0以下になる矩形は `None`。
    pub fn to_detection(&self, names: &[String], width: u32, height: u32) -> Option<Detection> {
        if width == 0 || height == 0 {
            return None;
        }
        if self.xyxy.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let max_x = width.saturating_sub(1).min(i32::MAX as u32) as i32;
        let max_y = height.saturating_sub(1).min(i32::MAX as u32) as i32;
        let [x1, y1, x2, y2] = self.xyxy;
        let bbox = BBox {
            xmin: (x1.trunc() as i32).clamp(0, max_x),
            ymin: (y1.trunc() as i32).clamp(0, max_y),
            xmax: (x2.trunc() as i32).clamp(0, max_x),
            ymax: (y2.trunc() as i32).clamp(0, max_y),
        };
        if !bbox.is_valid() {
            return None;
        }

        let confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Some(Detection {
            label: self.resolve_label(names),
            bbox,
            confidence,
        })
    }

    fn resolve_label(&self, names: &[String]) -> String {
        if let Some(label) = self.label.as_ref().filter(|l| !l.trim().is_empty()) {
            return label.clone();
        }
        match self.class_id {
            Some(id) => names.get(id).cloned().unwrap_or_else(|| id.to_string()),
            None => "unknown".to_string(),
        }
    }
}
