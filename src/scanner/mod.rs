use crate::error::{PhytoscopeError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// jpg/jpeg/png（大文字小文字を区別しない）
pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| is_image_extension(&ext.to_string_lossy()))
        .unwrap_or(false)
}

/// フォルダ直下の画像をファイル名順に列挙
pub fn scan_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(PhytoscopeError::FolderNotFound(folder.display().to_string()));
    }

    let mut images: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(1)  // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && has_image_extension(p))
        .collect();

    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(images)
}

/// CLI入力を画像パス列に展開
///
/// ファイルは指定順のまま（重複も残す）、フォルダは直下の画像に展開する。
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = scan_folder(input)?;
            log::debug!("{}: {}枚の画像", input.display(), found.len());
            images.extend(found);
        } else {
            images.push(input.clone());
        }
    }
    Ok(images)
}

/// 選択された画像の検証
///
/// 空・存在しない・jpg/jpeg/png以外はエラー。
pub fn validate_selection(paths: &[PathBuf]) -> Result<()> {
    if paths.is_empty() {
        return Err(PhytoscopeError::NoImagesSelected);
    }

    for path in paths {
        if !path.is_file() {
            return Err(PhytoscopeError::FileNotFound(path.display().to_string()));
        }
        if !has_image_extension(path) {
            return Err(PhytoscopeError::UnsupportedFormat(path.display().to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_is_image_extension() {
        assert!(is_image_extension("jpg"));
        assert!(is_image_extension("JPG"));
        assert!(is_image_extension("jpeg"));
        assert!(is_image_extension("Png"));
        assert!(!is_image_extension("txt"));
        assert!(!is_image_extension("gif"));
        assert!(!is_image_extension("bmp"));
    }

    #[test]
    fn test_scan_folder_not_found() {
        let result = scan_folder(Path::new("/nonexistent/folder"));
        assert!(matches!(result, Err(PhytoscopeError::FolderNotFound(_))));
    }

    #[test]
    fn test_scan_folder_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        for name in ["c.jpg", "a.PNG", "b.jpeg", "notes.txt"] {
            File::create(dir.path().join(name)).unwrap().write_all(b"dummy").unwrap();
        }
        fs::create_dir(dir.path().join("sub.jpg")).unwrap();

        let result = scan_folder(dir.path()).unwrap();
        let names: Vec<_> = result
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.jpeg", "c.jpg"]);
    }

    #[test]
    fn test_expand_inputs_keeps_order_and_duplicates() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("batch");
        fs::create_dir(&folder).unwrap();
        File::create(folder.join("x.jpg")).unwrap();
        let single = dir.path().join("z.png");
        File::create(&single).unwrap();

        let inputs = vec![single.clone(), folder.clone(), single.clone()];
        let expanded = expand_inputs(&inputs).unwrap();
        assert_eq!(expanded, vec![single.clone(), folder.join("x.jpg"), single]);
    }

    #[test]
    fn test_validate_selection() {
        let dir = tempdir().unwrap();
        let jpg = dir.path().join("a.jpg");
        let txt = dir.path().join("a.txt");
        File::create(&jpg).unwrap();
        File::create(&txt).unwrap();

        assert!(validate_selection(&[jpg.clone(), jpg.clone()]).is_ok());
        assert!(matches!(validate_selection(&[]), Err(PhytoscopeError::NoImagesSelected)));
        assert!(matches!(
            validate_selection(&[jpg.clone(), txt]),
            Err(PhytoscopeError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            validate_selection(&[dir.path().join("missing.png")]),
            Err(PhytoscopeError::FileNotFound(_))
        ));
    }
}
