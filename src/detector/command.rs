//! 外部推論コマンド連携
//!
//! `<program> <args...> <image_path> --imgsz <size>` を実行し、標準出力の
//! JSONを検出結果として読む。

use super::{Detector, DetectorOutput};
use crate::config::DetectorConfig;
use crate::error::{PhytoscopeError, Result};
use phytoscope_common::parse_detector_output;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: String,
    args: Vec<String>,
    class_names: Vec<String>,
}

impl CommandDetector {
    pub fn new(program: impl Into<String>, args: Vec<String>, class_names: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            class_names,
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        let program = config.program.clone().ok_or_else(|| {
            PhytoscopeError::Config(
                "検出コマンドが設定されていません。`phytoscope config --set-detector PROGRAM` で設定してください".into(),
            )
        })?;
        Ok(Self::new(program, config.args.clone(), config.class_names.clone()))
    }

    fn run(&self, image: &Path, inference_size: u32) -> Result<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(image)
            .args(["--imgsz", &inference_size.to_string()])
            .output()
            .map_err(|e| PhytoscopeError::Detector(format!("{} の実行に失敗: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PhytoscopeError::Detector(format!(
                "{} failed (code {:?}): {}",
                self.program,
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Detector for CommandDetector {
    fn detect(&mut self, image: &Path, inference_size: u32) -> Result<DetectorOutput> {
        log::debug!("検出開始: {} (imgsz={})", image.display(), inference_size);
        let stdout = self.run(image, inference_size)?;
        parse_output(&stdout, &self.class_names)
    }
}

/// 検出器の出力にクラス名が無ければ設定値で補う
fn parse_output(stdout: &str, fallback_names: &[String]) -> Result<DetectorOutput> {
    let (names, detections) = parse_detector_output(stdout)
        .map_err(|e| PhytoscopeError::DetectorParse(e.to_string()))?;
    let names = if names.is_empty() {
        fallback_names.to_vec()
    } else {
        names
    };
    Ok(DetectorOutput { names, detections })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorConfig;

    #[test]
    fn test_from_config_requires_program() {
        let result = CommandDetector::from_config(&DetectorConfig::default());
        assert!(matches!(result, Err(PhytoscopeError::Config(_))));
    }

    #[test]
    fn test_parse_output_uses_fallback_names() {
        let stdout = r#"[{"cls": 0, "xyxy": [1, 2, 3, 4], "conf": 0.4}]"#;
        let out = parse_output(stdout, &["diatom".to_string()]).unwrap();
        assert_eq!(out.names, vec!["diatom"]);
        assert_eq!(out.detections.len(), 1);
    }

    #[test]
    fn test_parse_output_prefers_detector_names() {
        let stdout = r#"{"names": ["ciliate"], "boxes": []}"#;
        let out = parse_output(stdout, &["diatom".to_string()]).unwrap();
        assert_eq!(out.names, vec!["ciliate"]);
    }

    #[test]
    fn test_parse_output_error() {
        let result = parse_output("Traceback (most recent call last)", &[]);
        assert!(matches!(result, Err(PhytoscopeError::DetectorParse(_))));
    }

    #[test]
    fn test_missing_program_is_detector_error() {
        let mut detector = CommandDetector::new("phytoscope-no-such-program", vec![], vec![]);
        let result = detector.detect(Path::new("a.jpg"), 640);
        assert!(matches!(result, Err(PhytoscopeError::Detector(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_external_program() {
        // sh -c '<script>' <image> --imgsz 640 → $0=<image>, $1=--imgsz, $2=640
        let script = r#"echo "{\"names\": [\"diatom\"], \"boxes\": [{\"cls\": 0, \"xyxy\": [1, 1, $2, 9], \"conf\": 0.5}]}""#;
        let mut detector = CommandDetector::new("sh", vec!["-c".into(), script.into()], vec![]);
        let out = detector.detect(Path::new("a.jpg"), 640).unwrap();
        assert_eq!(out.names, vec!["diatom"]);
        assert_eq!(out.detections[0].xyxy, [1.0, 1.0, 640.0, 9.0]);
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_detector_error() {
        let mut detector = CommandDetector::new("sh", vec!["-c".into(), "echo boom >&2; exit 3".into()], vec![]);
        let err = detector.detect(Path::new("a.jpg"), 640).unwrap_err();
        match err {
            PhytoscopeError::Detector(msg) => assert!(msg.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
