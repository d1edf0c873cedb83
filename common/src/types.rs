//! バッチ処理の型定義
//!
//! - IndexEntry: 入力表の1行
//! - ResolvedJob: 検証済みの処理単位
//! - ProcessingOutcome: 1行分の処理結果
//! - RunReport: 1バッチ分の集計
//! - RunEvent: ワーカー → 呼び出し側への通知

use crate::naming::{output_file_name, resolve_source_path, sanitize_index};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// 入力表の1行（ヘッダー行を除く）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// スプレッドシート上の行番号（1始まり、ヘッダーが1行目）
    pub row_number: usize,
    /// ファイルパス（相対/絶対、空の場合あり）
    pub raw_path: String,
    /// 索引ラベル（任意テキスト、空の場合あり）
    pub raw_index: String,
}

impl IndexEntry {
    pub fn new(row_number: usize, raw_path: impl Into<String>, raw_index: impl Into<String>) -> Self {
        Self {
            row_number,
            raw_path: raw_path.into(),
            raw_index: raw_index.into(),
        }
    }
}

/// 行を処理対象にできない理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    EmptyPath,
    MissingFile(PathBuf),
    EmptyIndex,
}

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowRejection::EmptyPath => write!(f, "file path is empty"),
            RowRejection::MissingFile(path) => write!(f, "file does not exist: {}", path.display()),
            RowRejection::EmptyIndex => write!(f, "index is empty"),
        }
    }
}

/// 検証済みの処理単位
///
/// `resolve` 経由でのみ構築され、パス・索引が空でなく、
/// 元ファイルが存在することが保証される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedJob {
    pub row_number: usize,
    pub source_path: PathBuf,
    pub sanitized_index: String,
    pub destination_path: PathBuf,
}

impl ResolvedJob {
    /// 入力行を検証して処理単位に変換
    ///
    /// 検証順序はパス → 存在確認 → 索引。
    pub fn resolve(
        entry: &IndexEntry,
        table_dir: &Path,
        output_dir: &Path,
    ) -> std::result::Result<Self, RowRejection> {
        let raw_path = entry.raw_path.trim();
        if raw_path.is_empty() {
            return Err(RowRejection::EmptyPath);
        }

        let source_path = resolve_source_path(table_dir, raw_path);
        if !source_path.is_file() {
            return Err(RowRejection::MissingFile(source_path));
        }

        let index = entry.raw_index.trim();
        if index.is_empty() {
            return Err(RowRejection::EmptyIndex);
        }

        let sanitized_index = sanitize_index(index);
        let base_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let destination_path = output_dir.join(output_file_name(&sanitized_index, &base_name));

        Ok(Self {
            row_number: entry.row_number,
            source_path,
            sanitized_index,
            destination_path,
        })
    }

    /// 元ファイルのファイル名
    pub fn source_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
}

/// 1行分の処理結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOutcome {
    pub row_number: usize,
    pub status: OutcomeStatus,
    /// 失敗時の詳細（成功時は空）
    pub message: String,
}

impl ProcessingOutcome {
    pub fn succeeded(row_number: usize) -> Self {
        Self {
            row_number,
            status: OutcomeStatus::Succeeded,
            message: String::new(),
        }
    }

    /// 行番号付きの失敗メッセージを生成
    pub fn failed(row_number: usize, detail: impl fmt::Display) -> Self {
        Self {
            row_number,
            status: OutcomeStatus::Failed,
            message: format!("row {}: {}", row_number, detail),
        }
    }

    pub fn rejected(row_number: usize, rejection: &RowRejection) -> Self {
        Self::failed(row_number, rejection)
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

/// 1バッチ分の集計結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<String>,
    /// 処理済み行数（中断時は total 未満）
    pub processed: usize,
    pub cancelled: bool,
    /// 書き出した error.log のパス
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_log: Option<PathBuf>,
}

impl RunReport {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// 処理結果を集計に加える
    pub fn record(&mut self, outcome: ProcessingOutcome) {
        self.processed += 1;
        match outcome.status {
            OutcomeStatus::Succeeded => self.succeeded += 1,
            OutcomeStatus::Failed => self.failures.push(outcome.message),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// error.log の内容（1行1件、改行区切り）
    pub fn error_log_contents(&self) -> String {
        self.failures.join("\n")
    }

    /// 人が読むための要約
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Processed {}/{} files successfully",
            self.succeeded, self.total
        );
        if self.cancelled {
            summary.push_str(&format!(
                "\nStopped after {} of {} rows",
                self.processed, self.total
            ));
        }
        if self.has_failures() {
            let log = self
                .error_log
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "error.log".to_string());
            summary.push_str(&format!("\n{} failed, see: {}", self.failures.len(), log));
        }
        summary
    }
}

/// ワーカーから呼び出し側へ送られるイベント
///
/// 1回の実行で終端イベント（Completed / FatalError）はちょうど1つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Progress { current: usize, total: usize },
    Completed { summary: String, report: RunReport },
    FatalError(String),
}

impl RunEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunEvent::Progress { .. })
    }
}
