//! 入力表テンプレート生成（共通ライブラリ）
//!
//! 1行目に説明付きヘッダー、2行目以降に記入例3行（相対・親相対・絶対パス）。

use crate::error::{Error, Result};
use rust_xlsxwriter::*;

/// ヘッダー（A列: パス、B列: 索引）
pub const TEMPLATE_HEADERS: [&str; 2] = [
    "PDF file path (relative paths supported)",
    "Index label (any text)",
];

/// 記入例
#[derive(Debug, Clone, Copy)]
pub struct TemplateRow {
    pub path: &'static str,
    pub index: &'static str,
}

pub const TEMPLATE_ROWS: &[TemplateRow] = &[
    TemplateRow { path: "files/report.pdf", index: "FIN-2023-001" },
    TemplateRow { path: "../finance/annual-report-2023.pdf", index: "財務部-0056" },
    TemplateRow { path: "C:/documents/important.pdf", index: "XM-2023-Q4" },
];

/// テンプレート生成後に表示する注意事項
pub const TEMPLATE_NOTES: &[&str] = &[
    "Column A holds the PDF file path",
    "Both absolute paths and paths relative to the workbook are accepted",
    "Column B holds the index label and may be any text",
    "A TrueType font covering the labels is required (simsun.ttc by default)",
];

/// 列幅（Excel文字数単位）
const PATH_COL_WIDTH: f64 = 50.0;
const INDEX_COL_WIDTH: f64 = 30.0;

/// テンプレートをバッファに生成
pub fn generate_template_buffer() -> Result<Vec<u8>> {
    build_template().map_err(|e| Error::Template(e.to_string()))
}

fn build_template() -> std::result::Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_border(FormatBorder::Thin);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Sheet1")?;
    worksheet.set_column_width(0, PATH_COL_WIDTH)?;
    worksheet.set_column_width(1, INDEX_COL_WIDTH)?;

    for (col, header) in TEMPLATE_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (i, row) in TEMPLATE_ROWS.iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_string(r, 0, row.path)?;
        worksheet.write_string(r, 1, row.index)?;
    }

    workbook.save_to_buffer()
}
