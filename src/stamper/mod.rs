//! PDFへの索引ラベル書き込み
//!
//! 1ページ目の寸法からラベル位置を計算し、同じ寸法のオーバーレイを
//! 全ページに合成して別ファイルとして保存する。元ファイルは読み取り専用。

pub mod font;
pub mod overlay;
mod subset;

pub use font::{GlyphRun, IndexFont};

use crate::error::{PdfIndexError, Result};
use lopdf::Document;
use pdf_index_common::{LabelPlacement, PageSize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// 1ファイル分のラベル書き込み
///
/// バッチ処理はこのトレイト越しにPDF処理を呼び出す。
pub trait Stamp {
    fn stamp(&self, source: &Path, label: &str, destination: &Path) -> Result<()>;
}

/// lopdf による実装
#[derive(Debug, Clone)]
pub struct PdfStamper {
    font: IndexFont,
    compress: bool,
}

impl PdfStamper {
    /// フォントを読み込んで初期化（行の処理前に失敗を返す）
    pub fn new(font_path: &Path) -> Result<Self> {
        let font = IndexFont::load(font_path)?;
        log::info!("フォント読み込み: {} ({})", font.name(), font_path.display());
        Ok(Self::with_font(font))
    }

    pub fn with_font(font: IndexFont) -> Self {
        Self {
            font,
            compress: true,
        }
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn font(&self) -> &IndexFont {
        &self.font
    }

    fn stamp_document(&self, source: &Path, label: &str, destination: &Path) -> std::result::Result<(), String> {
        let mut doc = Document::load(source).map_err(|e| format!("cannot open document: {}", e))?;

        let pages: Vec<_> = doc.get_pages().into_values().collect();
        let first_page = *pages.first().ok_or("document has no pages")?;

        // 1ページ目の寸法を全ページに使う
        let bbox = overlay::media_box(&doc, first_page)?;
        let page = PageSize::from_box(bbox);

        let run = self.font.shape(label);
        let placement = LabelPlacement::compute(page, run.em_width());
        log::debug!(
            "{}: page {}x{}pt, font {:.2}pt at ({:.2}, {:.2})",
            source.display(),
            page.width,
            page.height,
            placement.font_size,
            placement.x,
            placement.y
        );

        let font_id = self.font.embed(&mut doc, &run);
        let overlay_id = overlay::add_overlay(&mut doc, bbox, &placement, font_id, font::hex_string(&run))?;
        let save_state_id = overlay::add_save_state(&mut doc);

        for page_id in &pages {
            overlay::merge_onto_page(&mut doc, *page_id, overlay_id, save_state_id)?;
        }

        if self.compress {
            doc.compress();
        }

        let file = File::create(destination).map_err(|e| format!("cannot create {}: {}", destination.display(), e))?;
        let mut writer = BufWriter::new(file);
        doc.save_to(&mut writer)
            .map_err(|e| format!("cannot write {}: {}", destination.display(), e))?;
        writer
            .flush()
            .map_err(|e| format!("cannot write {}: {}", destination.display(), e))?;

        Ok(())
    }
}

impl Stamp for PdfStamper {
    fn stamp(&self, source: &Path, label: &str, destination: &Path) -> Result<()> {
        self.stamp_document(source, label, destination)
            .map_err(|detail| PdfIndexError::Stamp {
                file_name: source
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| source.display().to_string()),
                detail,
            })
    }
}
