use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdf-index")]
#[command(about = "Excelの索引表からPDFに索引番号を一括で書き込むツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 索引表に従ってPDFに索引番号を書き込む
    Run {
        /// 索引表（A列: PDFパス、B列: 索引番号）
        #[arg(required = true)]
        table: PathBuf,

        /// 出力ディレクトリ（なければ作成）
        #[arg(required = true)]
        output: PathBuf,

        /// フォントファイル（.ttf/.ttc）
        #[arg(long)]
        font: Option<PathBuf>,

        /// 結果をJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 索引表テンプレートを生成
    Template {
        /// 保存先（デフォルト: ./pdf-index-template.xlsx）
        path: Option<PathBuf>,

        /// 既存ファイルを確認なしで上書き
        #[arg(short, long)]
        force: bool,
    },

    /// 設定を表示/編集
    Config {
        /// フォントファイルを設定
        #[arg(long)]
        set_font: Option<PathBuf>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
