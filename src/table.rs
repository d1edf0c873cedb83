//! 入力表の読み込み
//!
//! 先頭シートの1行目をヘッダーとして読み飛ばし、
//! A列 = ファイルパス、B列 = 索引として2行目以降を返す。その他の列は無視する。

use crate::error::{PdfIndexError, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use pdf_index_common::IndexEntry;
use std::path::Path;

const PATH_COLUMN: u32 = 0;
const INDEX_COLUMN: u32 = 1;

pub fn read_index_table(path: &Path) -> Result<Vec<IndexEntry>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| PdfIndexError::TableOpen(format!("{}: {}", path.display(), e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PdfIndexError::TableOpen(format!("{}: ワークシートがありません", path.display())))?
        .map_err(|e| PdfIndexError::TableOpen(format!("{}: {}", path.display(), e)))?;

    Ok(entries_from_range(&range))
}

/// シート範囲から入力行を取り出す
///
/// calamine の Range は最初の非空セルから始まるため、絶対座標で参照する。
fn entries_from_range(range: &Range<Data>) -> Vec<IndexEntry> {
    let Some((last_row, _)) = range.end() else {
        return Vec::new();
    };

    (1..=last_row)
        .map(|row| {
            IndexEntry::new(
                row as usize + 1,
                cell_text(range.get_value((row, PATH_COLUMN))),
                cell_text(range.get_value((row, INDEX_COLUMN))),
            )
        })
        .collect()
}

/// セル値を文字列化（整数値の浮動小数は `.0` なし）
fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.clone(),
        Some(Data::Float(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Some(other) => other.to_string(),
    }
}
