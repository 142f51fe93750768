//! Page geometry extraction

use lopdf::{Document, Object, ObjectId};
use shared_types::{DocsignError, PageGeometry, Result};

const MAX_PAGE_TREE_DEPTH: usize = 64;

fn pdf_err(e: lopdf::Error) -> DocsignError {
    DocsignError::Pdf(e.to_string())
}

/// Number of pages in the document
pub fn page_count(pdf_bytes: &[u8]) -> Result<u32> {
    let doc = Document::load_mem(pdf_bytes).map_err(pdf_err)?;
    Ok(doc.get_pages().len() as u32)
}

/// Size and origin of every page, in page order.
///
/// The MediaBox is read from the page or inherited from its ancestors.
pub fn page_geometries(pdf_bytes: &[u8]) -> Result<Vec<PageGeometry>> {
    let doc = Document::load_mem(pdf_bytes).map_err(pdf_err)?;
    doc.get_pages()
        .into_iter()
        .map(|(page_number, page_id)| {
            let [x0, y0, x1, y1] = media_box(&doc, page_id)?.ok_or(
                DocsignError::MissingPageGeometry { page: page_number },
            )?;
            let (left, right) = (x0.min(x1), x0.max(x1));
            let (bottom, top) = (y0.min(y1), y0.max(y1));
            if right - left <= 0.0 || top - bottom <= 0.0 {
                return Err(DocsignError::invalid_geometry(format!(
                    "page {} has an empty MediaBox",
                    page_number
                )));
            }
            Ok(PageGeometry::new(page_number, right - left, top - bottom).with_origin(left, bottom))
        })
        .collect()
}

fn media_box(doc: &Document, page_id: ObjectId) -> Result<Option<[f64; 4]>> {
    let mut current = page_id;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let node = doc.get_dictionary(current).map_err(pdf_err)?;
        if let Ok(obj) = node.get(b"MediaBox") {
            return rectangle(doc, obj).map(Some);
        }
        match node.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => break,
        }
    }
    Ok(None)
}

fn rectangle(doc: &Document, obj: &Object) -> Result<[f64; 4]> {
    let items = match obj {
        Object::Array(items) => items,
        Object::Reference(id) => doc
            .get_object(*id)
            .and_then(Object::as_array)
            .map_err(pdf_err)?,
        _ => return Err(DocsignError::Pdf("MediaBox is not an array".to_string())),
    };
    if items.len() != 4 {
        return Err(DocsignError::Pdf(format!(
            "MediaBox has {} entries, expected 4",
            items.len()
        )));
    }
    let mut rect = [0.0; 4];
    for (slot, item) in rect.iter_mut().zip(items) {
        *slot = number(doc, item)?;
    }
    Ok(rect)
}

fn number(doc: &Document, obj: &Object) -> Result<f64> {
    match obj {
        Object::Integer(i) => Ok(*i as f64),
        Object::Real(r) => Ok(*r as f64),
        Object::Reference(id) => number(doc, doc.get_object(*id).map_err(pdf_err)?),
        other => Err(DocsignError::Pdf(format!(
            "expected a number in MediaBox, got {:?}",
            other
        ))),
    }
}
