//! 埋め込みフォント
//!
//! TrueType（.ttf）またはTrueTypeコレクション（.ttc）を読み込み、
//! Type0 / CIDFontType2（Identity-H）としてPDFに埋め込む。
//! コレクションの場合は指定フェイスを単独のsfntとして切り出してから埋め込む。

use crate::error::{PdfIndexError, Result};
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use super::subset::{subset_font, subset_tag};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use ttf_parser::{name_id, Face, GlyphId};

const TTC_TAG: &[u8; 4] = b"ttcf";
const SFNT_HEADER_LEN: usize = 12;
const TABLE_RECORD_LEN: usize = 16;

/// 描画用に変換済みのグリフ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub gid: u16,
    /// 送り幅（1/1000 em）
    pub width: u32,
    pub ch: char,
}

/// 1回分のラベル文字列をグリフ列にしたもの
#[derive(Debug, Clone, Default)]
pub struct GlyphRun {
    pub glyphs: Vec<Glyph>,
}

impl GlyphRun {
    /// フォントサイズ1ptでの幅
    pub fn em_width(&self) -> f32 {
        self.glyphs.iter().map(|g| g.width).sum::<u32>() as f32 / 1000.0
    }

    /// Identity-H 用のバイト列（GIDを2バイトずつ）
    pub fn encoded(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.glyphs.len() * 2);
        for glyph in &self.glyphs {
            bytes.extend_from_slice(&glyph.gid.to_be_bytes());
        }
        bytes
    }

    /// 使用GIDの集合
    pub fn glyph_ids(&self) -> BTreeSet<u16> {
        self.glyphs.iter().map(|g| g.gid).collect()
    }

    /// GID → (幅, 文字) の昇順マップ
    fn unique_glyphs(&self) -> BTreeMap<u16, (u32, char)> {
        self.glyphs
            .iter()
            .map(|g| (g.gid, (g.width, g.ch)))
            .collect()
    }
}

/// PDFに埋め込むフォント（プロセス中1回だけ読み込む）
#[derive(Debug, Clone)]
pub struct IndexFont {
    name: String,
    /// 単独sfntのバイト列
    data: Vec<u8>,
    units_per_em: u16,
    ascent: i32,
    descent: i32,
    cap_height: i32,
    bbox: [i32; 4],
}

impl IndexFont {
    pub fn load(path: &Path) -> Result<Self> {
        let font_error = |detail: String| PdfIndexError::FontLoad {
            path: path.display().to_string(),
            detail,
        };

        let raw = std::fs::read(path).map_err(|e| font_error(e.to_string()))?;
        let data = extract_face(&raw, 0).map_err(font_error)?;
        let fallback_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "IndexFont".to_string());

        Self::from_data(data, &fallback_name).map_err(font_error)
    }

    /// 単独sfntのバイト列から生成
    pub fn from_data(data: Vec<u8>, fallback_name: &str) -> std::result::Result<Self, String> {
        let face = Face::parse(&data, 0).map_err(|e| format!("フォント解析エラー: {}", e))?;
        if face.tables().glyf.is_none() {
            return Err("TrueTypeアウトライン（glyf）がありません。CFF系フォントには対応していません".to_string());
        }

        let units_per_em = face.units_per_em().max(1);
        let scale = |v: i16| (v as i32) * 1000 / units_per_em as i32;
        let global = face.global_bounding_box();

        let name = postscript_name(&face).unwrap_or_else(|| fallback_name.to_string());
        let ascent = scale(face.ascender());
        let descent = scale(face.descender());
        let cap_height = face.capital_height().map(scale).unwrap_or(ascent);
        let bbox = [
            scale(global.x_min),
            scale(global.y_min),
            scale(global.x_max),
            scale(global.y_max),
        ];

        Ok(Self {
            name: pdf_name(&name),
            data,
            units_per_em,
            ascent,
            descent,
            cap_height,
            bbox,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 文字列をグリフ列に変換
    ///
    /// フォントにない文字はGID 0（.notdef）になる。
    pub fn shape(&self, text: &str) -> GlyphRun {
        let face = match Face::parse(&self.data, 0) {
            Ok(face) => face,
            Err(_) => return GlyphRun::default(),
        };

        let glyphs = text
            .chars()
            .map(|ch| {
                let gid = face.glyph_index(ch).unwrap_or_else(|| {
                    log::warn!("フォント {} に文字がありません: {:?}", self.name, ch);
                    GlyphId(0)
                });
                let advance = face.glyph_hor_advance(gid).unwrap_or(0);
                Glyph {
                    gid: gid.0,
                    width: scaled_advance(advance, self.units_per_em),
                    ch,
                }
            })
            .collect();

        GlyphRun { glyphs }
    }

    /// Type0フォント一式をドキュメントに追加し、フォント辞書のIDを返す
    ///
    /// 埋め込むのは `run` で使うグリフだけのサブセット。
    pub fn embed(&self, doc: &mut Document, run: &GlyphRun) -> ObjectId {
        let glyph_ids = run.glyph_ids();
        let (font_data, base_font) = match subset_font(&self.data, &glyph_ids) {
            Ok(subset) => {
                log::debug!("サブセット化: {} → {} bytes", self.data.len(), subset.len());
                (subset, format!("{}+{}", subset_tag(&glyph_ids), self.name))
            }
            Err(e) => {
                log::warn!("フォントをサブセット化できないため全体を埋め込みます: {}", e);
                (self.data.clone(), self.name.clone())
            }
        };
        let base_font = Object::Name(base_font.into_bytes());

        let font_file_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => font_data.len() as i64 },
            font_data,
        ));

        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => base_font.clone(),
            "Flags" => 4,
            "FontBBox" => self.bbox.iter().map(|&v| Object::Integer(v as i64)).collect::<Vec<_>>(),
            "ItalicAngle" => 0,
            "Ascent" => self.ascent as i64,
            "Descent" => self.descent as i64,
            "CapHeight" => self.cap_height as i64,
            "StemV" => 80,
            "FontFile2" => Object::Reference(font_file_id),
        });

        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => base_font.clone(),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => Object::Reference(descriptor_id),
            "DW" => 1000,
            "W" => widths_array(run),
            "CIDToGIDMap" => "Identity",
        });

        let to_unicode_id = doc.add_object(Stream::new(
            dictionary! {},
            to_unicode_cmap(run).into_bytes(),
        ));

        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => base_font,
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
            "ToUnicode" => Object::Reference(to_unicode_id),
        })
    }
}

/// 送り幅をフォント単位から1/1000 em に変換
fn scaled_advance(advance: u16, units_per_em: u16) -> u32 {
    advance as u32 * 1000 / units_per_em.max(1) as u32
}

/// ラベル文字列（Tj の引数）
pub fn hex_string(run: &GlyphRun) -> Object {
    Object::String(run.encoded(), StringFormat::Hexadecimal)
}

fn postscript_name(face: &Face) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|n| n.name_id == name_id::POST_SCRIPT_NAME)
        .find_map(|n| n.to_string())
}

/// PDF名前オブジェクトに使えない文字を除去
fn pdf_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_graphic() && !"()<>[]{}/%#".contains(*c))
        .collect();
    if cleaned.is_empty() {
        "IndexFont".to_string()
    } else {
        cleaned
    }
}

/// W配列（連続GIDはまとめる）
fn widths_array(run: &GlyphRun) -> Vec<Object> {
    let glyphs: Vec<(u16, u32)> = run
        .unique_glyphs()
        .into_iter()
        .map(|(gid, (width, _))| (gid, width))
        .collect();

    let mut result = Vec::new();
    let mut i = 0;
    while i < glyphs.len() {
        let start = glyphs[i].0;
        let mut widths = vec![Object::Integer(glyphs[i].1 as i64)];

        while i + 1 < glyphs.len() && glyphs[i + 1].0 == glyphs[i].0 + 1 {
            i += 1;
            widths.push(Object::Integer(glyphs[i].1 as i64));
        }

        result.push(Object::Integer(start as i64));
        result.push(Object::Array(widths));
        i += 1;
    }
    result
}

/// ToUnicode CMap（テキスト抽出用）
fn to_unicode_cmap(run: &GlyphRun) -> String {
    let mut cmap = String::new();
    cmap.push_str("/CIDInit /ProcSet findresource begin\n");
    cmap.push_str("12 dict begin\n");
    cmap.push_str("begincmap\n");
    cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
    cmap.push_str("/CMapType 2 def\n");
    cmap.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    let mappings: Vec<(u16, char)> = run
        .unique_glyphs()
        .into_iter()
        .filter(|(gid, _)| *gid != 0)
        .map(|(gid, (_, ch))| (gid, ch))
        .collect();

    // bfchar は1セクション100件まで
    for chunk in mappings.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for &(gid, ch) in chunk {
            let mut units = [0u16; 2];
            let utf16: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", gid, utf16));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\n");
    cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
    cmap.push_str("end\nend\n");
    cmap
}

/// TrueTypeコレクションから1フェイスを単独sfntとして切り出す
///
/// コレクションでなければそのまま返す。
pub fn extract_face(data: &[u8], index: u32) -> std::result::Result<Vec<u8>, String> {
    if data.len() < SFNT_HEADER_LEN || &data[0..4] != TTC_TAG {
        return Ok(data.to_vec());
    }

    let num_fonts = BigEndian::read_u32(&data[8..12]);
    if index >= num_fonts {
        return Err(format!("フェイス番号 {} がありません（{}件）", index, num_fonts));
    }

    let dir_pos = SFNT_HEADER_LEN + index as usize * 4;
    let offset = read_u32_at(data, dir_pos)? as usize;
    let header = data
        .get(offset..offset + SFNT_HEADER_LEN)
        .ok_or("TTCヘッダーが不正です")?;
    let num_tables = BigEndian::read_u16(&header[4..6]) as usize;
    let header_len = SFNT_HEADER_LEN + num_tables * TABLE_RECORD_LEN;

    let mut out = Vec::with_capacity(data.len() / num_fonts.max(1) as usize);
    out.extend_from_slice(header);
    let mut tables = Vec::new();

    for i in 0..num_tables {
        let rec = offset + SFNT_HEADER_LEN + i * TABLE_RECORD_LEN;
        let record = data
            .get(rec..rec + TABLE_RECORD_LEN)
            .ok_or("テーブルレコードが不正です")?;
        let table_offset = BigEndian::read_u32(&record[8..12]) as usize;
        let length = BigEndian::read_u32(&record[12..16]) as usize;
        let table = data
            .get(table_offset..table_offset + length)
            .ok_or("テーブル範囲が不正です")?;

        let new_offset = (header_len + tables.len()) as u32;
        out.extend_from_slice(&record[0..8]);
        write_u32(&mut out, new_offset)?;
        write_u32(&mut out, length as u32)?;

        tables.extend_from_slice(table);
        while tables.len() % 4 != 0 {
            tables.push(0);
        }
    }

    out.extend_from_slice(&tables);
    Ok(out)
}

fn read_u32_at(data: &[u8], pos: usize) -> std::result::Result<u32, String> {
    data.get(pos..pos + 4)
        .map(BigEndian::read_u32)
        .ok_or_else(|| "TTCヘッダーが不正です".to_string())
}

fn write_u32(out: &mut Vec<u8>, value: u32) -> std::result::Result<(), String> {
    out.write_u32::<BigEndian>(value).map_err(|e| e.to_string())
}
