//! TrueTypeフォントのサブセット化
//!
//! 使用グリフ（複合グリフの部品を含む）以外の glyf データを空にし、
//! PDF埋め込みに必要なテーブルだけを残す。GIDは変えないので
//! CIDToGIDMap Identity と W配列はそのまま使える。

use byteorder::{BigEndian, ByteOrder};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

/// TrueType埋め込みで残すテーブル
const KEPT_TABLES: &[&[u8; 4]] = &[
    b"cvt ", b"fpgm", b"glyf", b"head", b"hhea", b"hmtx", b"loca", b"maxp", b"prep",
];

// 複合グリフのフラグ
const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

const CHECKSUM_ADJUSTMENT_OFFSET: usize = 8;
const INDEX_TO_LOC_FORMAT_OFFSET: usize = 50;
const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;

type SubsetResult<T> = std::result::Result<T, String>;

/// 使用GIDから決まる6文字のサブセットタグ（同じグリフ集合なら同じタグ）
pub fn subset_tag(glyph_ids: &BTreeSet<u16>) -> String {
    let mut hasher = DefaultHasher::new();
    glyph_ids.hash(&mut hasher);
    let mut hash = hasher.finish();

    let mut tag = String::with_capacity(6);
    for _ in 0..6 {
        tag.push((b'A' + (hash % 26) as u8) as char);
        hash /= 26;
    }
    tag
}

/// 単独sfntを指定グリフだけのフォントに縮める
pub fn subset_font(font: &[u8], glyph_ids: &BTreeSet<u16>) -> SubsetResult<Vec<u8>> {
    let sfnt_version = font.get(0..4).ok_or("sfntヘッダーが不正です")?;
    let tables = read_tables(font)?;

    let head = find_table(&tables, b"head")?;
    let maxp = find_table(&tables, b"maxp")?;
    let loca = find_table(&tables, b"loca")?;
    let glyf = find_table(&tables, b"glyf")?;

    if head.len() < INDEX_TO_LOC_FORMAT_OFFSET + 2 || maxp.len() < 6 {
        return Err("head/maxpテーブルが短すぎます".to_string());
    }
    let num_glyphs = BigEndian::read_u16(&maxp[4..6]) as usize;
    let long_loca = BigEndian::read_i16(&head[INDEX_TO_LOC_FORMAT_OFFSET..]) != 0;
    let offsets = glyph_offsets(loca, num_glyphs, long_loca)?;

    // .notdef と複合グリフの部品も残す
    let mut keep: BTreeSet<u16> = glyph_ids
        .iter()
        .copied()
        .filter(|&gid| (gid as usize) < num_glyphs)
        .collect();
    keep.insert(0);
    let mut pending: Vec<u16> = keep.iter().copied().collect();
    while let Some(gid) = pending.pop() {
        for component in component_glyphs(glyph_data(glyf, &offsets, gid as usize)?) {
            if (component as usize) < num_glyphs && keep.insert(component) {
                pending.push(component);
            }
        }
    }

    let mut new_glyf = Vec::new();
    let mut new_loca = Vec::with_capacity((num_glyphs + 1) * 4);
    for gid in 0..num_glyphs {
        new_loca.extend_from_slice(&(new_glyf.len() as u32).to_be_bytes());
        if keep.contains(&(gid as u16)) {
            new_glyf.extend_from_slice(glyph_data(glyf, &offsets, gid)?);
            pad_to_word(&mut new_glyf);
        }
    }
    new_loca.extend_from_slice(&(new_glyf.len() as u32).to_be_bytes());

    // loca は常に long 形式で書く
    let mut new_head = head.to_vec();
    BigEndian::write_i16(&mut new_head[INDEX_TO_LOC_FORMAT_OFFSET..], 1);
    BigEndian::write_u32(&mut new_head[CHECKSUM_ADJUSTMENT_OFFSET..], 0);

    let mut output: BTreeMap<[u8; 4], Vec<u8>> = BTreeMap::new();
    for table in &tables {
        if !KEPT_TABLES.contains(&&table.tag) {
            continue;
        }
        let data = match &table.tag {
            b"glyf" => std::mem::take(&mut new_glyf),
            b"loca" => std::mem::take(&mut new_loca),
            b"head" => std::mem::take(&mut new_head),
            _ => table.data.to_vec(),
        };
        output.insert(table.tag, data);
    }

    let mut font = assemble(sfnt_version, &output);
    if let Some(head_offset) = table_offset(&font, b"head") {
        let adjustment = CHECKSUM_MAGIC.wrapping_sub(checksum(&font));
        BigEndian::write_u32(&mut font[head_offset + CHECKSUM_ADJUSTMENT_OFFSET..], adjustment);
    }
    Ok(font)
}

struct TableRecord<'a> {
    tag: [u8; 4],
    data: &'a [u8],
}

fn read_tables<'a>(font: &'a [u8]) -> SubsetResult<Vec<TableRecord<'a>>> {
    let header = font.get(0..12).ok_or("sfntヘッダーが不正です")?;
    let num_tables = BigEndian::read_u16(&header[4..6]) as usize;

    (0..num_tables)
        .map(|i| -> SubsetResult<TableRecord<'a>> {
            let rec = 12 + i * 16;
            let record = font.get(rec..rec + 16).ok_or("テーブルレコードが不正です")?;
            let offset = BigEndian::read_u32(&record[8..12]) as usize;
            let length = BigEndian::read_u32(&record[12..16]) as usize;
            let mut tag = [0u8; 4];
            tag.copy_from_slice(&record[0..4]);
            let data = font.get(offset..offset + length).ok_or_else(|| {
                format!("テーブル範囲が不正です: {}", String::from_utf8_lossy(&tag))
            })?;
            Ok(TableRecord { tag, data })
        })
        .collect()
}

fn find_table<'a>(tables: &[TableRecord<'a>], tag: &[u8; 4]) -> SubsetResult<&'a [u8]> {
    tables
        .iter()
        .find(|t| &t.tag == tag)
        .map(|t| t.data)
        .ok_or_else(|| format!("{} テーブルがありません", String::from_utf8_lossy(tag)))
}

/// loca からグリフごとの glyf 内オフセット（numGlyphs + 1 個）
fn glyph_offsets(loca: &[u8], num_glyphs: usize, long_format: bool) -> SubsetResult<Vec<usize>> {
    let count = num_glyphs + 1;
    let entry = if long_format { 4 } else { 2 };
    if loca.len() < count * entry {
        return Err("locaテーブルが短すぎます".to_string());
    }

    let offsets: Vec<usize> = (0..count)
        .map(|i| {
            if long_format {
                BigEndian::read_u32(&loca[i * 4..]) as usize
            } else {
                BigEndian::read_u16(&loca[i * 2..]) as usize * 2
            }
        })
        .collect();
    if offsets.windows(2).any(|w| w[0] > w[1]) {
        return Err("locaのオフセットが昇順ではありません".to_string());
    }
    Ok(offsets)
}

fn glyph_data<'a>(glyf: &'a [u8], offsets: &[usize], gid: usize) -> SubsetResult<&'a [u8]> {
    glyf.get(offsets[gid]..offsets[gid + 1])
        .ok_or_else(|| format!("GID {} の glyf 範囲が不正です", gid))
}

/// 複合グリフが参照するGID（単純グリフなら空）
fn component_glyphs(glyph: &[u8]) -> Vec<u16> {
    let mut components = Vec::new();
    if glyph.len() < 10 || BigEndian::read_i16(&glyph[0..2]) >= 0 {
        return components;
    }

    let mut pos = 10;
    while let Some(header) = glyph.get(pos..pos + 4) {
        let flags = BigEndian::read_u16(&header[0..2]);
        components.push(BigEndian::read_u16(&header[2..4]));

        pos += 4;
        pos += if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
        if flags & WE_HAVE_A_SCALE != 0 {
            pos += 2;
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            pos += 4;
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            pos += 8;
        }

        if flags & MORE_COMPONENTS == 0 {
            break;
        }
    }
    components
}

fn pad_to_word(data: &mut Vec<u8>) {
    while data.len() % 4 != 0 {
        data.push(0);
    }
}

fn checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

/// テーブル群からsfntを組み立てる（タグ順）
fn assemble(sfnt_version: &[u8], tables: &BTreeMap<[u8; 4], Vec<u8>>) -> Vec<u8> {
    let num_tables = tables.len() as u16;
    let entry_selector = 15u16.saturating_sub(num_tables.leading_zeros() as u16);
    let search_range = (1u16 << entry_selector) * 16;
    let range_shift = (num_tables * 16).saturating_sub(search_range);

    let mut font = Vec::new();
    font.extend_from_slice(sfnt_version);
    font.extend_from_slice(&num_tables.to_be_bytes());
    font.extend_from_slice(&search_range.to_be_bytes());
    font.extend_from_slice(&entry_selector.to_be_bytes());
    font.extend_from_slice(&range_shift.to_be_bytes());

    let mut offset = 12 + tables.len() * 16;
    let mut body = Vec::new();
    for (tag, data) in tables {
        font.extend_from_slice(tag);
        font.extend_from_slice(&checksum(data).to_be_bytes());
        font.extend_from_slice(&(offset as u32).to_be_bytes());
        font.extend_from_slice(&(data.len() as u32).to_be_bytes());

        body.extend_from_slice(data);
        pad_to_word(&mut body);
        offset = 12 + tables.len() * 16 + body.len();
    }

    font.extend_from_slice(&body);
    font
}

fn table_offset(font: &[u8], tag: &[u8; 4]) -> Option<usize> {
    let num_tables = BigEndian::read_u16(font.get(4..6)?) as usize;
    (0..num_tables).find_map(|i| {
        let record = font.get(12 + i * 16..28 + i * 16)?;
        (&record[0..4] == tag).then(|| BigEndian::read_u32(&record[8..12]) as usize)
    })
}
