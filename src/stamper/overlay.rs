//! オーバーレイの生成とページへの合成
//!
//! オーバーレイは1ページ目と同じ寸法のForm XObject。
//! 各ページの元コンテンツを `q … Q` で囲み、その上にオーバーレイを描く。

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use pdf_index_common::LabelPlacement;

/// Parent をたどる上限（循環参照対策）
const MAX_INHERIT_DEPTH: usize = 32;
const OVERLAY_FONT_NAME: &str = "F1";
const OVERLAY_XOBJECT_PREFIX: &str = "IdxStamp";

type MergeResult<T> = std::result::Result<T, String>;

/// 参照なら実体を返す
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(v) => Some(*v as f32),
        Object::Real(v) => Some(*v as f32),
        _ => None,
    }
}

/// ページ属性を祖先の Pages ノードまでさかのぼって取得
pub fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// ページの MediaBox [llx lly urx ury]
pub fn media_box(doc: &Document, page_id: ObjectId) -> MergeResult<[f32; 4]> {
    let array = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .ok_or_else(|| "page has no MediaBox".to_string())?;

    let values: Vec<f32> = array
        .iter()
        .filter_map(|obj| number(resolve(doc, obj)))
        .collect();
    match values.as_slice() {
        [llx, lly, urx, ury] => Ok([*llx, *lly, *urx, *ury]),
        _ => Err(format!("invalid MediaBox: {:?}", array)),
    }
}

/// ラベルを描くForm XObjectを追加
pub fn add_overlay(
    doc: &mut Document,
    bbox: [f32; 4],
    placement: &LabelPlacement,
    font_id: ObjectId,
    text: Object,
) -> MergeResult<ObjectId> {
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(OVERLAY_FONT_NAME.as_bytes().to_vec()), Object::Real(placement.font_size)],
            ),
            Operation::new(
                "Td",
                vec![Object::Real(bbox[0] + placement.x), Object::Real(bbox[1] + placement.y)],
            ),
            Operation::new("Tj", vec![text]),
            Operation::new("ET", vec![]),
        ],
    };
    let bytes = content
        .encode()
        .map_err(|e| format!("overlay encode error: {}", e))?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => bbox.iter().map(|&v| Object::Real(v)).collect::<Vec<_>>(),
        "Resources" => dictionary! {
            "Font" => dictionary! { OVERLAY_FONT_NAME => Object::Reference(font_id) },
        },
    };
    Ok(doc.add_object(Stream::new(dict, bytes)))
}

/// 全ページで共有する `q` ストリーム
pub fn add_save_state(doc: &mut Document) -> ObjectId {
    doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()))
}

/// 1ページにオーバーレイを合成
pub fn merge_onto_page(
    doc: &mut Document,
    page_id: ObjectId,
    overlay_id: ObjectId,
    save_state_id: ObjectId,
) -> MergeResult<()> {
    let mut resources = page_resources(doc, page_id);
    let mut xobjects = match resources.get(b"XObject") {
        Ok(obj) => resolve(doc, obj).as_dict().cloned().unwrap_or_else(|_| Dictionary::new()),
        Err(_) => Dictionary::new(),
    };
    let name = unused_name(&xobjects);
    xobjects.set(name.as_bytes().to_vec(), Object::Reference(overlay_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let draw = format!("Q\nq /{} Do Q\n", name).into_bytes();
    let draw_id = doc.add_object(Stream::new(dictionary! {}, draw));

    let mut contents = vec![Object::Reference(save_state_id)];
    contents.extend(page_contents(doc, page_id));
    contents.push(Object::Reference(draw_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(|obj| obj.as_dict_mut())
        .map_err(|e| format!("page {:?} is not a dictionary: {}", page_id, e))?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// ページのリソース辞書（継承分を含む複製）
fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited_attribute(doc, page_id, b"Resources")
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new)
}

/// ページの既存コンテンツストリーム参照
fn page_contents(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        Ok(other) => {
            log::warn!("unexpected Contents entry on page {:?}: {:?}", page_id, other);
            Vec::new()
        }
        Err(_) => Vec::new(),
    }
}

/// 既存XObject名と衝突しない名前
fn unused_name(xobjects: &Dictionary) -> String {
    let mut name = OVERLAY_XOBJECT_PREFIX.to_string();
    let mut counter = 1;
    while xobjects.has(name.as_bytes()) {
        name = format!("{}{}", OVERLAY_XOBJECT_PREFIX, counter);
        counter += 1;
    }
    name
}
