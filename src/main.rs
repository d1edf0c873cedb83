use anyhow::{bail, Context, Result};
use clap::Parser;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_index_adder::{cli, config, template, BatchSession, CancelToken, PdfIndexError, PdfStamper};
use pdf_index_common::export::TEMPLATE_NOTES;
use pdf_index_common::{RunEvent, RunReport};
use cli::{Cli, Commands};
use config::Config;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Run { table, output, font, json } => {
            println!("📄 pdf-index - 索引番号の書き込み\n");

            if !table.is_file() {
                return Err(PdfIndexError::FileNotFound(table.display().to_string()).into());
            }

            // 1. フォント読み込み（行の処理前に失敗させる）
            let font_path = config.resolve_font_path(font.as_deref());
            println!("[1/2] フォントを読み込み中... ({})", font_path.display());
            let stamper = PdfStamper::new(&font_path)?.with_compression(config.compress_output);
            println!("✔ {}\n", stamper.font().name());

            // 2. バッチ処理
            println!("[2/2] PDFを処理中...");
            let session = BatchSession::start(table, output, stamper)?;
            install_interrupt_handler(session.cancel_token())?;
            let report = drive_session(&session, Duration::from_millis(config.poll_interval_ms))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }

            if report.cancelled {
                println!("\n⏹ 中断しました");
            } else {
                println!("\n✅ 完了");
            }
        }

        Commands::Template { path, force } => {
            let path = path.unwrap_or_else(|| PathBuf::from(template::DEFAULT_TEMPLATE_NAME));

            if path.exists() && !force && !confirm_overwrite(&path)? {
                println!("中止しました");
                return Ok(());
            }

            template::write_template(&path)
                .with_context(|| format!("テンプレートを保存できません: {}", path.display()))?;
            println!("✔ テンプレートを生成しました: {}", path.display());
            for (i, note) in TEMPLATE_NOTES.iter().enumerate() {
                println!("  {}. {}", i + 1, note);
            }
        }

        Commands::Config { set_font, show } => {
            let mut config = config;

            if let Some(font) = set_font {
                config.set_font_path(font)?;
                println!("✔ フォントを設定しました");
            }

            if show {
                println!("設定:");
                println!(
                    "  フォント: {}",
                    config.resolve_font_path(None).display()
                );
                println!("  ポーリング間隔: {}ms", config.poll_interval_ms);
                println!("  圧縮: {}", if config.compress_output { "有効" } else { "無効" });
            }
        }
    }

    Ok(())
}

fn init_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn confirm_overwrite(path: &Path) -> Result<bool> {
    Confirm::new()
        .with_prompt(format!("{} は既に存在します。上書きしますか？", path.display()))
        .default(false)
        .interact()
        .context("入力の読み取りに失敗しました")
}

/// Ctrl-C で中断を要求（2回目は即時終了）
///
/// 中断後も Completed を受け取るまでポーリングを続け、中断時の要約を表示する。
fn install_interrupt_handler(token: CancelToken) -> Result<()> {
    ctrlc::set_handler(move || {
        if token.is_cancelled() {
            std::process::exit(130);
        }
        eprintln!("\n中断します（処理中の行が終わるまで待機。もう一度押すと強制終了）");
        token.cancel();
    })
    .context("Ctrl-C ハンドラを設定できません")
}

/// イベントを一定間隔でポーリングして進捗を表示
fn drive_session(session: &BatchSession, interval: Duration) -> Result<RunReport> {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("  [{bar:40}] {pos}/{len} {msg}") {
        bar.set_style(style.progress_chars("=>-"));
    }

    loop {
        // 終了判定はイベントを取り出す前に行い、最後のイベントを取りこぼさない
        let finished = session.is_finished();

        while let Some(event) = session.try_next_event() {
            match event {
                RunEvent::Progress { current, total } => {
                    bar.set_length(total as u64);
                    bar.set_position(current as u64);
                }
                RunEvent::Completed { summary, report } => {
                    bar.finish_and_clear();
                    println!("{}", summary);
                    return Ok(report);
                }
                RunEvent::FatalError(message) => {
                    bar.abandon();
                    bail!(message);
                }
            }
        }

        if finished {
            bar.abandon();
            bail!("ワーカーが結果を返さずに終了しました");
        }

        std::thread::sleep(interval);
    }
}
