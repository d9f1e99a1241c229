//! セッションが保持する画像ごとのレコードと表示状態

use phytoscope_common::{BBox, Detection};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// 画像未選択
    Empty,
    /// 画像選択済み・未処理
    ImagesSelected,
    /// 検出処理済み
    Processed,
}

/// 処理済み画像の成果物
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedImage {
    pub detections: Vec<Detection>,
    /// `annotated_<stem>.jpg`（作業フォルダ内）
    pub annotated_path: PathBuf,
    /// `<stem>.xml`（作業フォルダ内）
    pub label_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RecordOutcome {
    Pending,
    Processed(ProcessedImage),
    Failed(String),
}

/// 画像1枚分（元画像・検出結果・注釈付き画像を1レコードにまとめる）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRecord {
    pub source: PathBuf,
    pub outcome: RecordOutcome,
}

impl ImageRecord {
    pub fn new(source: PathBuf) -> Self {
        Self {
            source,
            outcome: RecordOutcome::Pending,
        }
    }

    pub fn processed(&self) -> Option<&ProcessedImage> {
        match &self.outcome {
            RecordOutcome::Processed(p) => Some(p),
            _ => None,
        }
    }

    pub fn detections(&self) -> &[Detection] {
        self.processed().map(|p| p.detections.as_slice()).unwrap_or(&[])
    }

    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// 画像1枚分の処理失敗
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessFailure {
    pub index: usize,
    pub source: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessReport {
    pub processed: usize,
    pub failures: Vec<ProcessFailure>,
}

impl ProcessReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 表示層に渡す現在画像の状態
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSpec {
    pub index: usize,
    pub count: usize,
    pub source: PathBuf,
    pub file_name: String,
    pub detections: Vec<Detection>,
    /// 強調表示する検出結果の番号
    pub highlighted: Option<usize>,
    pub annotated_path: Option<PathBuf>,
}

impl RenderSpec {
    pub fn highlighted_detection(&self) -> Option<&Detection> {
        self.highlighted.and_then(|i| self.detections.get(i))
    }

    /// 検出結果一覧 `"LABEL (0.93)"`
    pub fn list_entries(&self) -> Vec<String> {
        self.detections.iter().map(Detection::list_entry).collect()
    }

    pub fn info_text(&self) -> String {
        format!("Displaying: {}", self.file_name)
    }
}

/// 各操作を有効にしてよいか
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionAvailability {
    pub process: bool,
    pub navigate: bool,
    pub export_all: bool,
    pub export_current: bool,
}

/// 先頭一致で強調対象を探す
pub(crate) fn find_highlight(detections: &[Detection], bbox: &BBox) -> Option<usize> {
    detections.iter().position(|d| d.bbox == *bbox)
}
