//! 入力表テンプレートの保存

use crate::error::Result;
use pdf_index_common::export::generate_template_buffer;
use std::path::Path;

/// 既定のテンプレートファイル名
pub const DEFAULT_TEMPLATE_NAME: &str = "pdf-index-template.xlsx";

/// テンプレートを書き出す（既存ファイルは上書き）
pub fn write_template(path: &Path) -> Result<()> {
    let buffer = generate_template_buffer()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, buffer)?;
    Ok(())
}
