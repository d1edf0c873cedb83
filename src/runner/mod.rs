//! バッチ処理
//!
//! 入力表を1行ずつ検証してラベルを書き込み、結果を集計する。
//! 行単位の失敗は記録して続行し、入力表が読めない等の致命的エラーのみ中断する。

mod session;

pub use session::BatchSession;

use crate::error::Result;
use crate::stamper::Stamp;
use crate::table::read_index_table;
use pdf_index_common::{IndexEntry, ProcessingOutcome, ResolvedJob, RunEvent, RunReport};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 失敗行を書き出すファイル名
pub const ERROR_LOG_NAME: &str = "error.log";

/// 中断フラグ（呼び出し側が立て、ワーカーが行の切れ目で確認する）
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct BatchRunner<S> {
    stamper: S,
    cancel: CancelToken,
}

impl<S: Stamp> BatchRunner<S> {
    pub fn new(stamper: S, cancel: CancelToken) -> Self {
        Self { stamper, cancel }
    }

    /// 1バッチを実行し、進捗と終端イベントを `emit` に渡す
    ///
    /// 終端イベントは Completed か FatalError のどちらか1つだけ。
    pub fn run<F>(&self, table_path: &Path, output_dir: &Path, mut emit: F)
    where
        F: FnMut(RunEvent),
    {
        match self.process_table(table_path, output_dir, &mut emit) {
            Ok(report) => {
                log::info!(
                    "バッチ完了: {}/{} 成功, 失敗 {}",
                    report.succeeded,
                    report.total,
                    report.failures.len()
                );
                emit(RunEvent::Completed {
                    summary: report.summary(),
                    report,
                });
            }
            Err(e) => {
                log::error!("致命的エラー: {}", e);
                emit(RunEvent::FatalError(format!("fatal error: {}", e)));
            }
        }
    }

    fn process_table<F>(&self, table_path: &Path, output_dir: &Path, emit: &mut F) -> Result<RunReport>
    where
        F: FnMut(RunEvent),
    {
        let entries = read_index_table(table_path)?;
        let table_dir = table_dir(table_path)?;
        let total = entries.len();
        let mut report = RunReport::new(total);
        log::info!("{}: {}行", table_path.display(), total);

        for (i, entry) in entries.iter().enumerate() {
            if self.cancel.is_cancelled() {
                log::info!("中断要求: {}/{}行で停止", i, total);
                report.cancelled = true;
                break;
            }

            let outcome = self.process_entry(entry, &table_dir, output_dir);
            if !outcome.is_success() {
                log::warn!("{}", outcome.message);
            }
            report.record(outcome);

            emit(RunEvent::Progress {
                current: i + 1,
                total,
            });
        }

        if report.has_failures() {
            let log_path = output_dir.join(ERROR_LOG_NAME);
            std::fs::write(&log_path, report.error_log_contents())?;
            report.error_log = Some(log_path);
        }

        Ok(report)
    }

    /// 1行分を処理（想定内の不備はエラーではなく失敗結果として返す）
    pub fn process_entry(&self, entry: &IndexEntry, table_dir: &Path, output_dir: &Path) -> ProcessingOutcome {
        let job = match ResolvedJob::resolve(entry, table_dir, output_dir) {
            Ok(job) => job,
            Err(rejection) => return ProcessingOutcome::rejected(entry.row_number, &rejection),
        };

        match self
            .stamper
            .stamp(&job.source_path, &job.sanitized_index, &job.destination_path)
        {
            Ok(()) => {
                log::debug!(
                    "row {}: {} -> {}",
                    job.row_number,
                    job.source_name(),
                    job.destination_path.display()
                );
                ProcessingOutcome::succeeded(job.row_number)
            }
            Err(e) => ProcessingOutcome::failed(job.row_number, format!("processing failed: {}", e)),
        }
    }
}

/// 入力表のあるディレクトリ（相対パスの基準）
fn table_dir(table_path: &Path) -> Result<PathBuf> {
    let absolute = if table_path.is_absolute() {
        table_path.to_path_buf()
    } else {
        std::env::current_dir()?.join(table_path)
    };
    Ok(absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/")))
}
