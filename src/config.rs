use crate::error::{PhytoscopeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 描画色 (R, G, B)
pub const BOX_COLOR: [u8; 3] = [255, 0, 0];
pub const HIGHLIGHT_COLOR: [u8; 3] = [0, 0, 255];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 注釈付き画像の作業フォルダ
    pub annotated_dir: PathBuf,
    /// ラベルXMLの作業フォルダ
    pub label_dir: PathBuf,
    /// 推論サイズ（検出器に渡す）
    pub inference_size: u32,
    /// 外部検出コマンド
    pub detector: DetectorConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub program: Option<String>,
    pub args: Vec<String>,
    /// 検出器がクラス名を返さない場合に使う
    pub class_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub box_width: u32,
    pub display_width: u32,
    pub display_height: u32,
    /// 信頼度ラベル用フォント（TTF/OTF）
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            annotated_dir: PathBuf::from("annotated_results"),
            label_dir: PathBuf::from("labels"),
            inference_size: 640,
            detector: DetectorConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            box_width: 3,
            display_width: 800,
            display_height: 600,
            font_path: None,
            font_size: 24.0,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            log::debug!("設定を読み込みました: {}", config_path.display());
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PhytoscopeError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("phytoscope").join("config.json"))
    }

    pub fn set_detector(&mut self, program: String, args: Vec<String>) -> Result<()> {
        self.detector.program = Some(program);
        self.detector.args = args;
        self.save()
    }

    pub fn set_font(&mut self, path: PathBuf) -> Result<()> {
        if !path.exists() {
            return Err(PhytoscopeError::FileNotFound(path.display().to_string()));
        }
        self.render.font_path = Some(path);
        self.save()
    }
}
