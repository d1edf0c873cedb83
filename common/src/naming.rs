//! 出力ファイル名とパス解決
//!
//! 索引ラベルはそのままファイル名の先頭に付くため、
//! パス区切りやWindowsで使えない文字を `_` に置換する。

use regex::Regex;
use std::path::{Path, PathBuf};

/// 置換対象の文字: \ / * ? : " < > |
pub const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

lazy_static::lazy_static! {
    static ref FORBIDDEN_RE: Regex = Regex::new(r#"[\\/*?:"<>|]"#).unwrap();
}

/// 索引ラベルをファイル名に使える形に変換
pub fn sanitize_index(index: &str) -> String {
    FORBIDDEN_RE.replace_all(index, "_").into_owned()
}

/// 出力ファイル名: `{索引}_{元ファイル名}`
pub fn output_file_name(sanitized_index: &str, base_name: &str) -> String {
    format!("{}_{}", sanitized_index, base_name)
}

/// 入力表のディレクトリを基準にパスを解決
///
/// 絶対パスはそのまま、相対パスは `table_dir` に連結する（正規化はしない）。
pub fn resolve_source_path(table_dir: &Path, raw_path: &str) -> PathBuf {
    let path = Path::new(raw_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        table_dir.join(path)
    }
}
