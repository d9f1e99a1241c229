//! アノテーションセッション
//!
//! 選択画像の一覧・検出結果・表示中の番号・強調表示を1つの値で管理する。
//! 表示層（CLI/GUI）はここの操作を呼び、`RenderSpec` を描画するだけ。
//!
//! 状態遷移: `Empty -> ImagesSelected -> Processed`
//! - 画像を選び直すと `ImagesSelected` に戻る
//! - 処理をやり直すと `Processed` のまま結果を上書きする

mod record;

pub use record::{
    ActionAvailability, ImageRecord, ProcessFailure, ProcessReport, ProcessedImage,
    RecordOutcome, RenderSpec, SessionState,
};

use crate::config::Config;
use crate::detector::Detector;
use crate::error::{PhytoscopeError, Result};
use crate::export::{self, ExportSummary};
use crate::render;
use phytoscope_common::{BBox, Detection};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Session {
    records: Vec<ImageRecord>,
    state: SessionState,
    index: usize,
    highlight: Option<BBox>,
    displayed: bool,
    annotated_dir: PathBuf,
    label_dir: PathBuf,
    inference_size: u32,
    box_width: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            records: Vec::new(),
            state: SessionState::Empty,
            index: 0,
            highlight: None,
            displayed: false,
            annotated_dir: config.annotated_dir.clone(),
            label_dir: config.label_dir.clone(),
            inference_size: config.inference_size,
            box_width: config.render.box_width,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 表示中の番号（画像が無ければ None）
    pub fn current_index(&self) -> Option<usize> {
        if self.records.is_empty() {
            None
        } else {
            Some(self.index)
        }
    }

    pub fn current_record(&self) -> Option<&ImageRecord> {
        self.current_index().and_then(|i| self.records.get(i))
    }

    pub fn highlight(&self) -> Option<BBox> {
        self.highlight
    }

    pub fn has_displayed(&self) -> bool {
        self.displayed
    }

    pub fn processed_count(&self) -> usize {
        self.records.iter().filter(|r| r.processed().is_some()).count()
    }

    /// 画像一覧を置き換える（検出はまだ行わない）
    ///
    /// 検証に失敗した場合セッションは変更しない。
    pub fn select_images(&mut self, paths: Vec<PathBuf>) -> Result<()> {
        crate::scanner::validate_selection(&paths)?;

        log::info!("{}枚の画像を選択", paths.len());
        self.records = paths.into_iter().map(ImageRecord::new).collect();
        self.state = SessionState::ImagesSelected;
        self.reset_view();
        Ok(())
    }

    /// 全画像に検出をかけ、注釈付き画像とラベルXMLを作業フォルダに書き出す
    pub fn process_all<D: Detector + ?Sized>(&mut self, detector: &mut D) -> Result<ProcessReport> {
        self.process_all_with_progress(detector, |_, _, _| {})
    }

    /// `process_all` と同じ。1枚ごとに `progress(番号, 総数, パス)` を呼ぶ
    ///
    /// 1枚の失敗は `Failed` として記録し、残りの処理を続ける。
    pub fn process_all_with_progress<D, F>(
        &mut self,
        detector: &mut D,
        mut progress: F,
    ) -> Result<ProcessReport>
    where
        D: Detector + ?Sized,
        F: FnMut(usize, usize, &Path),
    {
        if self.state == SessionState::Empty {
            return Err(PhytoscopeError::NoImagesSelected);
        }

        std::fs::create_dir_all(&self.annotated_dir)?;
        std::fs::create_dir_all(&self.label_dir)?;

        let total = self.records.len();
        let mut report = ProcessReport::default();

        for index in 0..total {
            let source = self.records[index].source.clone();
            progress(index, total, &source);

            let outcome = match self.process_one(detector, &source) {
                Ok(processed) => {
                    log::info!(
                        "[{}/{}] {}: {}件検出",
                        index + 1,
                        total,
                        source.display(),
                        processed.detections.len()
                    );
                    report.processed += 1;
                    RecordOutcome::Processed(processed)
                }
                Err(err) => {
                    log::warn!("[{}/{}] {}: {}", index + 1, total, source.display(), err);
                    report.failures.push(ProcessFailure {
                        index,
                        source: source.clone(),
                        reason: err.to_string(),
                    });
                    RecordOutcome::Failed(err.to_string())
                }
            };
            self.records[index].outcome = outcome;
        }

        self.state = SessionState::Processed;
        self.reset_view();
        Ok(report)
    }

    fn process_one<D: Detector + ?Sized>(&self, detector: &mut D, source: &Path) -> Result<ProcessedImage> {
        let (width, height) = image::image_dimensions(source)
            .map_err(|e| PhytoscopeError::ImageLoad(format!("{}: {}", source.display(), e)))?;

        let output = detector.detect(source, self.inference_size)?;
        let detections: Vec<Detection> = output
            .detections
            .iter()
            .filter_map(|raw| {
                let det = raw.to_detection(&output.names, width, height);
                if det.is_none() {
                    log::debug!("無効なボックスを除外: {:?}", raw.xyxy);
                }
                det
            })
            .collect();

        let annotated_path = self.annotated_dir.join(export::annotated_file_name(source));
        render::write_annotated_image(source, &detections, self.box_width, &annotated_path)?;
        let label_path = export::write_label_file(source, &detections, &self.label_dir)?;

        Ok(ProcessedImage {
            detections,
            annotated_path,
            label_path,
        })
    }

    fn reset_view(&mut self) {
        self.index = 0;
        self.highlight = None;
        self.displayed = false;
    }

    fn ensure_navigable(&self) -> Result<()> {
        if self.state != SessionState::Processed || self.records.is_empty() {
            return Err(PhytoscopeError::NoProcessedImages);
        }
        Ok(())
    }

    /// 表示番号を `[0, len-1]` に丸めて設定
    pub fn set_current_index(&mut self, index: usize) -> Result<usize> {
        self.ensure_navigable()?;
        let clamped = index.min(self.records.len() - 1);
        if clamped != self.index {
            self.highlight = None;
        }
        self.index = clamped;
        Ok(clamped)
    }

    /// 前の画像へ（先頭では何もしない）
    pub fn previous(&mut self) -> Result<usize> {
        self.ensure_navigable()?;
        let target = self.index.saturating_sub(1);
        self.set_current_index(target)
    }

    /// 次の画像へ（末尾では何もしない）
    pub fn next(&mut self) -> Result<usize> {
        self.ensure_navigable()?;
        let target = self.index.saturating_add(1);
        self.set_current_index(target)
    }

    /// 表示中画像の `index` 番目の検出結果を強調対象にする
    pub fn select_detection(&mut self, index: usize) -> Result<BBox> {
        self.ensure_navigable()?;
        let detections = self.records[self.index].detections();
        let det = detections.get(index).ok_or(PhytoscopeError::DetectionOutOfRange {
            index,
            count: detections.len(),
        })?;
        self.highlight = Some(det.bbox);
        Ok(det.bbox)
    }

    pub fn clear_highlight(&mut self) {
        self.highlight = None;
    }

    /// 表示状態を返す
    ///
    /// `highlight` を渡すとそれを、渡さなければ `select_detection` で選んだ矩形を
    /// 強調対象とする。表示中画像の検出結果に一致しなければ無視する。
    pub fn display_state(&mut self, highlight: Option<BBox>) -> Result<RenderSpec> {
        self.ensure_navigable()?;
        let record = &self.records[self.index];
        let detections = record.detections().to_vec();
        let highlighted = highlight
            .or(self.highlight)
            .and_then(|bbox| record::find_highlight(&detections, &bbox));

        let spec = RenderSpec {
            index: self.index,
            count: self.records.len(),
            source: record.source.clone(),
            file_name: record.file_name(),
            detections,
            highlighted,
            annotated_path: record.processed().map(|p| p.annotated_path.clone()),
        };
        self.displayed = true;
        Ok(spec)
    }

    pub fn actions(&self) -> ActionAvailability {
        let navigate = self.state == SessionState::Processed && !self.records.is_empty();
        let current_processed = self
            .current_record()
            .map(|r| r.processed().is_some())
            .unwrap_or(false);
        ActionAvailability {
            process: self.state != SessionState::Empty,
            navigate,
            export_all: navigate && self.processed_count() > 0,
            export_current: navigate && self.displayed && current_processed,
        }
    }

    /// 処理済みの全画像について注釈付き画像とラベルXMLを `output_dir` に保存
    pub fn export_to_folder(&self, output_dir: &Path) -> Result<ExportSummary> {
        if self.state != SessionState::Processed {
            return Err(PhytoscopeError::NoProcessedImages);
        }
        let items = self
            .records
            .iter()
            .filter_map(|r| r.processed().map(|p| (r.source.as_path(), p)));
        export::export_to_folder(items, output_dir)
    }

    /// 表示中画像の注釈付き画像を `dest` にコピー
    pub fn export_current_annotated_image(&self, dest: &Path) -> Result<()> {
        if !self.actions().export_current {
            return Err(PhytoscopeError::NoProcessedImages);
        }
        let processed = self
            .current_record()
            .and_then(ImageRecord::processed)
            .ok_or(PhytoscopeError::NoProcessedImages)?;
        export::copy_annotated_image(&processed.annotated_path, dest)?;
        log::info!("注釈付き画像を保存: {}", dest.display());
        Ok(())
    }
}
