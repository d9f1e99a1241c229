use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhytoscopeError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("画像が選択されていません")]
    NoImagesSelected,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("未対応の画像形式です (jpg/jpeg/pngのみ): {0}")]
    UnsupportedFormat(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("検出器エラー: {0}")]
    Detector(String),

    #[error("検出器の出力のパースに失敗: {0}")]
    DetectorParse(String),

    #[error("処理済みの画像がありません (no image processed)")]
    NoProcessedImages,

    #[error("検出結果の番号が範囲外です: {index} (件数: {count})")]
    DetectionOutOfRange { index: usize, count: usize },

    #[error("{operation}に失敗しました: {cause}")]
    Export { operation: String, cause: String },

    #[error("ラベルXMLエラー: {0}")]
    Label(#[from] phytoscope_common::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),
}

impl From<image::ImageError> for PhytoscopeError {
    fn from(err: image::ImageError) -> Self {
        PhytoscopeError::ImageLoad(err.to_string())
    }
}

impl PhytoscopeError {
    pub(crate) fn export(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        PhytoscopeError::Export {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PhytoscopeError>;
