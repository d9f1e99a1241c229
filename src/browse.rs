//! 対話式ブラウズモジュール
//!
//! 処理済みセッションを1枚ずつ表示し、検出結果の強調・保存を行う。
//! 操作はすべて `Session` に委譲し、ここでは入力と表示だけを扱う。

use crate::error::{PhytoscopeError, Result};
use crate::render::Renderer;
use crate::session::{RenderSpec, Session};
use dialoguer::Input;
use std::path::PathBuf;

/// 対話アクション
#[derive(Debug, Clone, PartialEq)]
pub enum BrowseAction {
    Next,
    Previous,
    /// 画像番号（1始まり）
    Goto(usize),
    /// 検出結果番号（1始まり）
    Select(usize),
    ClearHighlight,
    /// 表示画像をPNG等に書き出す
    Render(PathBuf),
    /// 全結果をフォルダに保存
    ExportAll(PathBuf),
    /// 注釈付き画像を保存
    SaveCurrent(PathBuf),
    Help,
    Quit,
    Invalid(String),
}

const HELP: &str =
    "操作: [n]次 [p]前 [g N]移動 [s K]検出を強調 [c]強調解除 [r PATH]表示を書き出し [e DIR]全保存 [w PATH]注釈画像を保存 [h]ヘルプ [q]終了";

pub fn parse_action(input: &str) -> BrowseAction {
    let trimmed = input.trim();
    let (cmd, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (trimmed, ""),
    };

    let number = |arg: &str| arg.parse::<usize>().ok().filter(|n| *n > 0);
    let path = |arg: &str| (!arg.is_empty()).then(|| PathBuf::from(arg));

    let action = match cmd {
        "" | "n" => Some(BrowseAction::Next),
        "p" => Some(BrowseAction::Previous),
        "g" => number(arg).map(BrowseAction::Goto),
        "s" => number(arg).map(BrowseAction::Select),
        "c" => Some(BrowseAction::ClearHighlight),
        "r" => path(arg).map(BrowseAction::Render),
        "e" => path(arg).map(BrowseAction::ExportAll),
        "w" => path(arg).map(BrowseAction::SaveCurrent),
        "h" | "?" => Some(BrowseAction::Help),
        "q" | "Q" => Some(BrowseAction::Quit),
        _ => None,
    };
    action.unwrap_or_else(|| BrowseAction::Invalid(trimmed.to_string()))
}

fn print_spec(spec: &RenderSpec) {
    println!("\n[{}/{}] {}", spec.index + 1, spec.count, spec.info_text());
    if spec.annotated_path.is_none() {
        println!("  (この画像は処理に失敗しています)");
    }
    if spec.detections.is_empty() {
        println!("  検出なし");
    }
    for (i, entry) in spec.list_entries().iter().enumerate() {
        let marker = if spec.highlighted == Some(i) { "▶" } else { " " };
        println!("  {} {:>2}. {}  {}", marker, i + 1, entry, spec.detections[i].bbox);
    }
}

/// 1アクションを実行。終了なら false
pub fn apply_action(session: &mut Session, renderer: &Renderer, action: BrowseAction) -> Result<bool> {
    match action {
        BrowseAction::Next => {
            session.next()?;
        }
        BrowseAction::Previous => {
            session.previous()?;
        }
        BrowseAction::Goto(n) => {
            session.set_current_index(n.saturating_sub(1))?;
        }
        BrowseAction::Select(k) => {
            session.select_detection(k.saturating_sub(1))?;
        }
        BrowseAction::ClearHighlight => session.clear_highlight(),
        BrowseAction::Render(path) => {
            let spec = session.display_state(None)?;
            renderer.render_to_file(&spec, &path)?;
            println!("✔ 表示画像を書き出し: {}", path.display());
        }
        BrowseAction::ExportAll(dir) => {
            let summary = session.export_to_folder(&dir)?;
            println!(
                "✔ 結果を保存しました: {} (画像{}件, ラベル{}件)",
                summary.output_dir.display(),
                summary.annotated_images.len(),
                summary.label_files.len()
            );
        }
        BrowseAction::SaveCurrent(path) => {
            session.export_current_annotated_image(&path)?;
            println!("✔ 注釈付き画像を保存しました: {}", path.display());
        }
        BrowseAction::Help => println!("{}", HELP),
        BrowseAction::Quit => return Ok(false),
        BrowseAction::Invalid(input) => {
            println!("不明な操作です: {}", input);
            println!("{}", HELP);
        }
    }
    Ok(true)
}

/// 対話式で画像を確認
pub fn run_browse(session: &mut Session, renderer: &Renderer) -> Result<()> {
    if !session.actions().navigate {
        return Err(PhytoscopeError::NoProcessedImages);
    }

    println!("{}", HELP);
    if !renderer.has_font() {
        println!("(フォント未設定のため信頼度ラベルは描画されません)");
    }

    loop {
        let spec = session.display_state(None)?;
        print_spec(&spec);

        let input: String = Input::new()
            .with_prompt("操作")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| PhytoscopeError::CliExecution(e.to_string()))?;

        match apply_action(session, renderer, parse_action(&input)) {
            Ok(true) => {}
            Ok(false) => break,
            // 失敗しても続行
            Err(err) => println!("⚠ {}", err),
        }
    }

    Ok(())
}
