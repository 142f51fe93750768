//! Write finished page canvases into a PDF

use std::collections::BTreeMap;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use shared_types::{DocsignError, Result};

use crate::asset::RasterImage;
use crate::canvas::{render_op, PageCanvas};

const FONT_RESOURCE: &str = "DsF1";
const MAX_PAGE_TREE_DEPTH: usize = 64;

fn pdf_err(e: lopdf::Error) -> DocsignError {
    DocsignError::Pdf(e.to_string())
}

/// Resource name and object id of each embedded image, by source digest
type ImageTable = BTreeMap<String, (String, ObjectId)>;

/// Append the drawing operations of every canvas to its page.
///
/// Canvases are written in ascending page order so the same input always
/// produces the same bytes. Returns the input unchanged when nothing is drawn.
pub fn write_canvases(pdf_bytes: &[u8], canvases: &[PageCanvas]) -> Result<Vec<u8>> {
    let mut ordered: Vec<&PageCanvas> = canvases.iter().filter(|c| !c.is_empty()).collect();
    if ordered.is_empty() {
        return Ok(pdf_bytes.to_vec());
    }
    ordered.sort_by_key(|c| c.page_number());

    let mut doc = Document::load_mem(pdf_bytes).map_err(pdf_err)?;
    let pages = doc.get_pages();

    let mut images = ImageTable::new();
    let mut font_id: Option<ObjectId> = None;

    for canvas in ordered {
        let page_id = *pages
            .get(&canvas.page_number())
            .ok_or(DocsignError::MissingPageGeometry {
                page: canvas.page_number(),
            })?;
        write_page(&mut doc, page_id, canvas, &mut images, &mut font_id)?;
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| DocsignError::Pdf(e.to_string()))?;

    tracing::debug!(
        bytes = output.len(),
        images = images.len(),
        "wrote page canvases"
    );
    Ok(output)
}

fn write_page(
    doc: &mut Document,
    page_id: ObjectId,
    canvas: &PageCanvas,
    images: &mut ImageTable,
    font_id: &mut Option<ObjectId>,
) -> Result<()> {
    let mut resources = resolve_page_resources(doc, page_id)?;

    if canvas.has_text() {
        let id = *font_id.get_or_insert_with(|| doc.add_object(helvetica()));
        let mut fonts = resolve_subdictionary(doc, &resources, b"Font")?;
        fonts.set(FONT_RESOURCE, Object::Reference(id));
        resources.set("Font", Object::Dictionary(fonts));
    }

    if canvas.images().next().is_some() {
        let mut xobjects = resolve_subdictionary(doc, &resources, b"XObject")?;
        for image in canvas.images() {
            let (name, id) = match images.get(&image.source_digest) {
                Some(entry) => entry.clone(),
                None => {
                    let id = add_image(doc, image);
                    let entry = (format!("DsIm{}", images.len()), id);
                    images.insert(image.source_digest.clone(), entry.clone());
                    entry
                }
            };
            xobjects.set(name, Object::Reference(id));
        }
        resources.set("XObject", Object::Dictionary(xobjects));
    }

    let mut content = String::new();
    let image_name = |image: &RasterImage| {
        images
            .get(&image.source_digest)
            .map(|(name, _)| name.clone())
            .unwrap_or_default()
    };
    for op in canvas.ops() {
        render_op(op, &mut content, &image_name, FONT_RESOURCE).map_err(|_| {
            DocsignError::Pdf(format!(
                "failed to render content for page {}",
                canvas.page_number()
            ))
        })?;
    }

    // Isolate the existing content's graphics state from ours
    let existing = existing_contents(doc, page_id)?;
    let mut contents = Vec::with_capacity(existing.len() + 2);
    if !existing.is_empty() {
        let open = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        contents.push(Object::Reference(open));
        contents.extend(existing);
        content.insert_str(0, "Q\n");
    }
    let ours = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    contents.push(Object::Reference(ours));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(pdf_err)?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(contents));
    Ok(())
}

fn helvetica() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    }
}

fn add_image(doc: &mut Document, image: &RasterImage) -> ObjectId {
    let width = Object::Integer(image.width as i64);
    let height = Object::Integer(image.height as i64);

    let smask = image.alpha.as_ref().map(|alpha| {
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width.clone(),
                "Height" => height.clone(),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => Object::Integer(8),
                "Filter" => "FlateDecode",
            },
            alpha.clone(),
        ))
    });

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => image.color_space,
        "BitsPerComponent" => Object::Integer(image.bits_per_component as i64),
        "Filter" => image.filter,
    };
    if let Some(id) = smask {
        dict.set("SMask", Object::Reference(id));
    }
    doc.add_object(Stream::new(dict, image.data.clone()))
}

fn resolve_dict(doc: &Document, obj: &Object) -> Result<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Ok(dict.clone()),
        Object::Reference(id) => doc.get_dictionary(*id).cloned().map_err(pdf_err),
        _ => Ok(Dictionary::new()),
    }
}

/// Resources of the page, following inheritance through the page tree.
/// Returned as an owned copy so it can be written back inline.
fn resolve_page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut current = page_id;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        let node = doc.get_dictionary(current).map_err(pdf_err)?;
        if let Ok(resources) = node.get(b"Resources") {
            return resolve_dict(doc, resources);
        }
        match node.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => break,
        }
    }
    Ok(Dictionary::new())
}

fn resolve_subdictionary(doc: &Document, resources: &Dictionary, key: &[u8]) -> Result<Dictionary> {
    match resources.get(key) {
        Ok(obj) => resolve_dict(doc, obj),
        Err(_) => Ok(Dictionary::new()),
    }
}

fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_dictionary(page_id).map_err(pdf_err)?;
    Ok(match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    })
}
