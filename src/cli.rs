use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "phytoscope")]
#[command(about = "植物プランクトン検出・アノテーション出力ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像を検出処理し、注釈付き画像とラベルXMLを作業フォルダに出力
    Process {
        /// 画像ファイル or フォルダ（フォルダは直下のjpg/pngを対象）
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// 処理結果を保存するフォルダ
        #[arg(short, long)]
        export_dir: Option<PathBuf>,

        /// 画像ごとの処理結果をJSONで出力
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// 処理後、対話的に画像を切り替えて確認・保存
    Browse {
        /// 画像ファイル or フォルダ
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// 検出コマンドを設定
        #[arg(long)]
        set_detector: Option<String>,

        /// 検出コマンドの引数（複数指定可）
        #[arg(long = "detector-arg", requires = "set_detector", allow_hyphen_values = true)]
        detector_args: Vec<String>,

        /// 信頼度ラベル用フォントを設定
        #[arg(long)]
        set_font: Option<PathBuf>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
