//! 物体検出器との境界
//!
//! 推論そのものは外部（学習済みモデル）に任せる。ここでは
//! 「画像パス + 推論サイズ → 検出結果一覧」の契約だけを定義する。

mod command;

pub use command::CommandDetector;

use crate::error::Result;
use phytoscope_common::RawDetection;
use std::path::Path;

/// 検出器1回分の出力
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorOutput {
    /// クラス番号 → クラス名
    pub names: Vec<String>,
    pub detections: Vec<RawDetection>,
}

pub trait Detector {
    fn detect(&mut self, image: &Path, inference_size: u32) -> Result<DetectorOutput>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, image: &Path, inference_size: u32) -> Result<DetectorOutput> {
        (**self).detect(image, inference_size)
    }
}
