#![allow(dead_code)]

use std::io::Cursor;

use image::{ImageBuffer, ImageFormat, Rgba};
use lopdf::{dictionary, Document, Object, Stream};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// PDF with `pages` pages of the given size, each with its own content stream
pub fn pdf_with_pages(pages: u32, width: i64, height: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });

    let mut kids = Vec::new();
    for n in 1..=pages {
        let text = format!("BT /F1 11 Tf 72 {} Td (Page {}) Tj ET", height - 72, n);
        let content_id = doc.add_object(Stream::new(dictionary! {}, text.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0i64.into(), 0i64.into(), width.into(), height.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

pub fn a4_pdf(pages: u32) -> Vec<u8> {
    pdf_with_pages(pages, 595, 842)
}

pub fn signature_png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, _| {
        if x % 7 == 0 {
            Rgba([0u8, 0, 0, 255])
        } else {
            Rgba([255u8, 255, 255, 0])
        }
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Text of the last content stream on `page`, where signing output lands
pub fn last_content_stream(pdf: &[u8], page: u32) -> String {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = doc.get_pages()[&page];
    let page = doc.get_dictionary(page_id).unwrap();
    let contents = page.get(b"Contents").unwrap().as_array().unwrap();
    let id = contents.last().unwrap().as_reference().unwrap();
    let stream = doc.get_object(id).unwrap().as_stream().unwrap();
    String::from_utf8_lossy(&stream.content).into_owned()
}
