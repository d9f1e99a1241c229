//! ラベルXML（サイドカー）の書き出し

use crate::error::Result;
use phytoscope_common::{build_label_xml, Detection};
use std::path::{Path, PathBuf};

pub(crate) fn file_stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string())
}

fn base_name(source: &Path) -> String {
    source
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// `<stem>.xml`
pub fn label_file_name(source: &Path) -> String {
    format!("{}.xml", file_stem(source))
}

/// ラベルXMLを `dir/<stem>.xml` に書き出す
///
/// 同名ファイルがあれば上書きする。
pub fn write_label_file(source: &Path, detections: &[Detection], dir: &Path) -> Result<PathBuf> {
    let path = dir.join(label_file_name(source));
    if path.exists() {
        log::debug!("ラベルXMLを上書き: {}", path.display());
    }
    let xml = build_label_xml(&base_name(source), detections);
    std::fs::write(&path, xml)?;
    Ok(path)
}
