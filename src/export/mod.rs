mod label;

pub use label::{label_file_name, write_label_file};

use crate::error::{PhytoscopeError, Result};
use crate::session::ProcessedImage;
use std::path::{Path, PathBuf};

/// `annotated_<stem>.jpg`
pub fn annotated_file_name(source: &Path) -> String {
    format!("annotated_{}.jpg", label::file_stem(source))
}

/// 一括保存の結果
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub output_dir: PathBuf,
    pub annotated_images: Vec<PathBuf>,
    pub label_files: Vec<PathBuf>,
}

/// `src` と `dest` が同じファイルを指すか（`dest` が無ければ false）
fn is_same_file(src: &Path, dest: &Path) -> bool {
    match (std::fs::canonicalize(src), std::fs::canonicalize(dest)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// 同一ファイルへのコピーは行わない（`fs::copy` は自身を切り詰めるため）
fn copy_artifact(src: &Path, dest: &Path) -> std::io::Result<()> {
    if is_same_file(src, dest) {
        log::debug!("コピー元と同じファイルのためスキップ: {}", dest.display());
        return Ok(());
    }
    std::fs::copy(src, dest)?;
    Ok(())
}

/// 処理済み画像の注釈付き画像とラベルXMLを `output_dir` に保存
///
/// 途中で失敗した場合、それまでに書いたファイルは残る。
pub fn export_to_folder<'a, I>(items: I, output_dir: &Path) -> Result<ExportSummary>
where
    I: IntoIterator<Item = (&'a Path, &'a ProcessedImage)>,
{
    const OPERATION: &str = "結果の保存";

    let items: Vec<_> = items.into_iter().collect();
    if items.is_empty() {
        return Err(PhytoscopeError::NoProcessedImages);
    }

    std::fs::create_dir_all(output_dir).map_err(|e| {
        PhytoscopeError::export(OPERATION, format!("{}: {}", output_dir.display(), e))
    })?;

    let mut summary = ExportSummary {
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    };

    for (source, processed) in items {
        let file_name = processed
            .annotated_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(annotated_file_name(source)));
        let dest = output_dir.join(file_name);
        copy_artifact(&processed.annotated_path, &dest).map_err(|e| {
            PhytoscopeError::export(OPERATION, format!("{}: {}", processed.annotated_path.display(), e))
        })?;
        summary.annotated_images.push(dest);

        let label_path = write_label_file(source, &processed.detections, output_dir)
            .map_err(|e| PhytoscopeError::export(OPERATION, e))?;
        summary.label_files.push(label_path);
    }

    log::info!(
        "{}件の結果を保存: {}",
        summary.annotated_images.len(),
        output_dir.display()
    );
    Ok(summary)
}

/// 注釈付き画像を1枚だけ任意のパスへコピー（形式変換はしない）
pub fn copy_annotated_image(annotated_path: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| PhytoscopeError::export("注釈付き画像の保存", e))?;
    }
    copy_artifact(annotated_path, dest).map_err(|e| {
        PhytoscopeError::export(
            "注釈付き画像の保存",
            format!("{} → {}: {}", annotated_path.display(), dest.display(), e),
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use phytoscope_common::{BBox, Detection};
    use tempfile::tempdir;

    #[test]
    fn test_annotated_file_name() {
        assert_eq!(annotated_file_name(Path::new("/x/a.png")), "annotated_a.jpg");
        assert_eq!(annotated_file_name(Path::new("b.jpeg")), "annotated_b.jpg");
    }

    #[test]
    fn test_export_to_folder_copies_pairs() {
        let dir = tempdir().unwrap();
        let annotated = dir.path().join("annotated_a.jpg");
        std::fs::write(&annotated, b"jpeg bytes").unwrap();
        let processed = ProcessedImage {
            detections: vec![Detection {
                label: "diatom".into(),
                bbox: BBox::new(0, 0, 4, 4),
                confidence: 0.5,
            }],
            annotated_path: annotated.clone(),
            label_path: dir.path().join("a.xml"),
        };
        let source = PathBuf::from("/images/a.jpg");
        let out = dir.path().join("out/nested");

        let summary = export_to_folder([(source.as_path(), &processed)], &out).unwrap();
        assert_eq!(summary.annotated_images, vec![out.join("annotated_a.jpg")]);
        assert_eq!(summary.label_files, vec![out.join("a.xml")]);
        assert_eq!(std::fs::read(out.join("annotated_a.jpg")).unwrap(), b"jpeg bytes");
    }

    #[test]
    fn test_export_to_folder_missing_artifact() {
        let dir = tempdir().unwrap();
        let processed = ProcessedImage {
            detections: vec![],
            annotated_path: dir.path().join("annotated_gone.jpg"),
            label_path: dir.path().join("gone.xml"),
        };
        let source = PathBuf::from("gone.jpg");
        let result = export_to_folder([(source.as_path(), &processed)], &dir.path().join("out"));
        assert!(matches!(result, Err(PhytoscopeError::Export { .. })));
    }

    #[test]
    fn test_export_to_folder_nothing_processed() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("never_created");
        let result = export_to_folder(std::iter::empty(), &out);
        assert!(matches!(result, Err(PhytoscopeError::NoProcessedImages)));
        assert!(!out.exists());
    }

    #[test]
    fn test_copy_annotated_image_raw_bytes() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("annotated_a.jpg");
        std::fs::write(&src, b"\xff\xd8raw").unwrap();
        let dest = dir.path().join("saved/copy.png");
        copy_annotated_image(&src, &dest).unwrap();
        assert_eq!(std::fs::read(dest).unwrap(), b"\xff\xd8raw");
    }

    #[test]
    fn test_copy_annotated_image_onto_itself() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("annotated_a.jpg");
        std::fs::write(&src, b"\xff\xd8raw").unwrap();
        let same = dir.path().join(".").join("annotated_a.jpg");
        copy_annotated_image(&src, &same).unwrap();
        assert_eq!(std::fs::read(&src).unwrap(), b"\xff\xd8raw");
    }
}
