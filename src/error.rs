use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfIndexError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("入力表を開けません: {0}")]
    TableOpen(String),

    #[error("フォントを読み込めません: {path}: {detail}")]
    FontLoad { path: String, detail: String },

    /// 1ファイル分のPDF処理失敗（元ファイル名と原因）
    #[error("PDF processing failed: {file_name}: {detail}")]
    Stamp { file_name: String, detail: String },

    #[error("出力ディレクトリを作成できません: {0}")]
    OutputDir(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    /// テンプレート生成など共通ライブラリ由来のエラー
    #[error(transparent)]
    Common(#[from] pdf_index_common::Error),
}

pub type Result<T> = std::result::Result<T, PdfIndexError>;
