//! 索引ラベルの配置計算
//!
//! すべてpt単位。ページ寸法に対する比率で決まる（1ページ目基準）。

/// フォントサイズ = ページ高さ × 3%
pub const FONT_SIZE_RATIO: f32 = 0.03;
/// 右余白 = ページ幅 × 3%
pub const RIGHT_MARGIN_RATIO: f32 = 0.03;
/// 上余白 = ページ高さ × 3%
pub const TOP_MARGIN_RATIO: f32 = 0.03;
/// ベースラインを上余白からフォントサイズ×1.2下げる
pub const BASELINE_DROP_FACTOR: f32 = 1.2;

/// ページ寸法（pt）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// MediaBox [llx lly urx ury] から寸法を取得
    pub fn from_box(media_box: [f32; 4]) -> Self {
        Self {
            width: (media_box[2] - media_box[0]).abs(),
            height: (media_box[3] - media_box[1]).abs(),
        }
    }
}

/// ラベル描画位置（ページ左下原点、pt）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPlacement {
    pub font_size: f32,
    pub x: f32,
    pub y: f32,
    pub text_width: f32,
}

impl LabelPlacement {
    /// 右上寄せの配置を計算
    ///
    /// `em_width` はフォントサイズ1ptでのテキスト幅（= 送り幅合計 / unitsPerEm）。
    pub fn compute(page: PageSize, em_width: f32) -> Self {
        let font_size = page.height * FONT_SIZE_RATIO;
        let right_margin = page.width * RIGHT_MARGIN_RATIO;
        let top_margin = page.height * TOP_MARGIN_RATIO;
        let text_width = em_width * font_size;

        Self {
            font_size,
            x: page.width - right_margin - text_width,
            y: page.height - top_margin - font_size * BASELINE_DROP_FACTOR,
            text_width,
        }
    }
}
