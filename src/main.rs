use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use phytoscope::{browse, cli, config, detector, error, render, scanner, session};
use cli::{Cli, Commands};
use config::Config;
use detector::CommandDetector;
use error::Result;
use session::{ProcessReport, Session};
use std::path::PathBuf;

fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// 画像選択 → 検出処理（進捗バー付き）
fn select_and_process(config: &Config, inputs: &[PathBuf]) -> Result<(Session, ProcessReport)> {
    let mut detector = CommandDetector::from_config(&config.detector)?;
    let mut session = Session::new(config);

    println!("[1/2] 画像を選択中...");
    let images = scanner::expand_inputs(inputs)?;
    session.select_images(images)?;
    println!("✔ {}枚の画像を選択\n", session.len());

    println!("[2/2] 検出処理中...");
    let bar = ProgressBar::new(session.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let report = session.process_all_with_progress(&mut detector, |index, _, path| {
        bar.set_position(index as u64);
        bar.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        );
    })?;
    bar.finish_and_clear();

    println!("✔ {}枚を処理", report.processed);
    for failure in &report.failures {
        println!("⚠ {}: {}", failure.source.display(), failure.reason);
    }
    println!(
        "  注釈付き画像: {}\n  ラベル: {}\n",
        config.annotated_dir.display(),
        config.label_dir.display()
    );

    Ok((session, report))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Process { inputs, export_dir, report } => {
            println!("🔬 phytoscope - 検出処理\n");

            let (session, process_report) = select_and_process(&config, &inputs)?;

            if let Some(dir) = export_dir {
                let summary = session.export_to_folder(&dir)?;
                println!(
                    "✔ 結果を保存: {} (画像{}件, ラベル{}件)",
                    summary.output_dir.display(),
                    summary.annotated_images.len(),
                    summary.label_files.len()
                );
            }

            if let Some(path) = report {
                let json = serde_json::to_string_pretty(session.records())?;
                std::fs::write(&path, json)?;
                println!("✔ 処理結果を保存: {}", path.display());
            }

            if process_report.is_complete() {
                println!("\n✅ 完了");
            } else {
                println!("\n⚠ {}枚の処理に失敗しました", process_report.failures.len());
            }
        }

        Commands::Browse { inputs } => {
            println!("🔬 phytoscope - ブラウズ\n");

            let renderer = render::Renderer::new(config.render.clone())?;
            let (mut session, _) = select_and_process(&config, &inputs)?;
            browse::run_browse(&mut session, &renderer)?;
        }

        Commands::Config { set_detector, detector_args, set_font, show } => {
            let mut config = config;

            if let Some(program) = set_detector {
                config.set_detector(program, detector_args)?;
                println!("✔ 検出コマンドを設定しました");
            }

            if let Some(font) = set_font {
                config.set_font(font)?;
                println!("✔ フォントを設定しました");
            }

            if show {
                println!("設定:");
                println!("  注釈付き画像フォルダ: {}", config.annotated_dir.display());
                println!("  ラベルフォルダ: {}", config.label_dir.display());
                println!("  推論サイズ: {}px", config.inference_size);
                match &config.detector.program {
                    Some(program) => println!("  検出コマンド: {} {}", program, config.detector.args.join(" ")),
                    None => println!("  検出コマンド: 未設定"),
                }
                println!(
                    "  フォント: {}",
                    config
                        .render
                        .font_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "未設定".into())
                );
            }
        }
    }

    Ok(())
}
