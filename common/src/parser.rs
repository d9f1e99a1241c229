//! 検出器出力パーサー
//!
//! 外部推論コマンドの標準出力からJSONを抽出し、RawDetectionの一覧と
//! クラス名テーブルに変換する

use crate::error::{Error, Result};
use crate::types::RawDetection;
use serde::Deserialize;

/// 検出器出力からJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. 生の [...] 配列
/// 4. エラー
///
/// # Examples
/// ```
/// use phytoscope_common::extract_json;
///
/// let output = "loading weights...\n[{\"cls\": 0}]";
/// let json = extract_json(output).unwrap();
/// assert!(json.starts_with('['));
/// ```
pub fn extract_json(output: &str) -> Result<&str> {
    if let Some(start_marker) = output.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = output[start..].find("```") {
            let end = start + end_offset;
            return Ok(output[start..end].trim());
        }
    }

    // 先に現れる方の括弧を採用する
    let object = output.find('{').zip(output.rfind('}'));
    let array = output.find('[').zip(output.rfind(']'));
    let span = match (object, array) {
        (Some(o), Some(a)) => Some(if o.0 < a.0 { o } else { a }),
        (o, a) => o.or(a),
    };

    match span {
        Some((start, end)) if end >= start => Ok(&output[start..=end]),
        _ => Err(Error::Parse("JSONが見つかりません".into())),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DetectorOutput {
    Wrapped {
        #[serde(default)]
        names: Names,
        boxes: Vec<RawDetection>,
    },
    Bare(Vec<RawDetection>),
}

/// クラス名テーブル（配列 or {"0": "name"} 形式）
#[derive(Deserialize, Default)]
#[serde(untagged)]
enum Names {
    #[default]
    None,
    List(Vec<String>),
    Map(std::collections::BTreeMap<String, String>),
}

/// `{"0": "name"}` 形式で受け付けるクラス番号の上限
const MAX_CLASS_ID: usize = 65_535;

impl Names {
    fn into_vec(self) -> Result<Vec<String>> {
        match self {
            Names::None => Ok(Vec::new()),
            Names::List(list) => Ok(list),
            Names::Map(map) => {
                let indexed: Vec<(usize, String)> = map
                    .into_iter()
                    .filter_map(|(k, v)| k.trim().parse::<usize>().ok().map(|i| (i, v)))
                    .collect();
                if let Some((i, _)) = indexed.iter().find(|(i, _)| *i > MAX_CLASS_ID) {
                    return Err(Error::Parse(format!(
                        "クラス番号が大きすぎます: {} (上限 {})",
                        i, MAX_CLASS_ID
                    )));
                }
                let len = indexed.iter().map(|(i, _)| i + 1).max().unwrap_or(0);
                let mut names = vec![String::new(); len];
                for (i, name) in indexed {
                    names[i] = name;
                }
                Ok(names)
            }
        }
    }
}

/// 検出器出力をパース
///
/// # Returns
/// * `Ok((names, detections))` - クラス名テーブルと生の検出結果
/// * `Err` - JSONが見つからないかパース失敗
pub fn parse_detector_output(output: &str) -> Result<(Vec<String>, Vec<RawDetection>)> {
    let json_str = extract_json(output)?;
    let parsed: DetectorOutput = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("検出結果JSONパースエラー: {}", e)))?;

    Ok(match parsed {
        DetectorOutput::Wrapped { names, boxes } => (names.into_vec()?, boxes),
        DetectorOutput::Bare(boxes) => (Vec::new(), boxes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_block() {
        let output = "log line\n```json\n{\"boxes\": []}\n```\ntrailing";
        assert_eq!(extract_json(output).unwrap(), "{\"boxes\": []}");
    }

    #[test]
    fn test_extract_json_object_before_array() {
        let output = "image 1/1 640x480\n{\"names\": [\"a\"], \"boxes\": [{\"cls\": 0}]}";
        let json = extract_json(output).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.ends_with('}'));
    }

    #[test]
    fn test_extract_json_missing() {
        assert!(matches!(extract_json("no detections here"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_wrapped_output() {
        let output = r#"{"names": ["diatom", "ciliate"],
            "boxes": [{"cls": 1, "xyxy": [1.5, 2.5, 30.0, 40.0], "conf": 0.8}]}"#;
        let (names, boxes) = parse_detector_output(output).unwrap();
        assert_eq!(names, vec!["diatom", "ciliate"]);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].class_id, Some(1));
        assert_eq!(boxes[0].confidence, 0.8);
    }

    #[test]
    fn test_parse_names_map() {
        let output = r#"{"names": {"0": "diatom", "2": "ciliate"}, "boxes": []}"#;
        let (names, boxes) = parse_detector_output(output).unwrap();
        assert_eq!(names, vec!["diatom".to_string(), String::new(), "ciliate".to_string()]);
        assert!(boxes.is_empty());
    }

    #[test]
    fn test_parse_names_map_oversized_class_id() {
        let output = r#"{"names": {"4000000000000": "x"}, "boxes": []}"#;
        assert!(matches!(parse_detector_output(output), Err(Error::Parse(_))));

        let output = r#"{"names": {"65535": "last"}, "boxes": []}"#;
        let (names, _) = parse_detector_output(output).unwrap();
        assert_eq!(names.len(), 65_536);
        assert_eq!(names[65_535], "last");
    }

    #[test]
    fn test_parse_bare_array() {
        let output = r#"[{"name": "diatom", "bbox": [0, 0, 10, 10], "score": 0.5}]"#;
        let (names, boxes) = parse_detector_output(output).unwrap();
        assert!(names.is_empty());
        assert_eq!(boxes[0].label.as_deref(), Some("diatom"));
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = parse_detector_output("[{\"cls\": }]");
        assert!(matches!(result, Err(Error::Parse(_))));
    }
}
