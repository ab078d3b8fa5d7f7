//! Fixture helpers shared by the CLI integration tests.

#![allow(dead_code)]

use std::path::Path;

use lopdf::{Document, Object, Stream, dictionary};

/// Build an n-page PDF whose pages carry letters-only body text.
pub fn text_pdf(n: usize) -> Vec<u8> {
    const BODIES: [&str; 6] = [
        "cuerpo alfa", "cuerpo beta", "cuerpo gamma", "cuerpo delta", "cuerpo epsilon",
        "cuerpo zeta",
    ];
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for i in 0..n {
        let body = BODIES[i % BODIES.len()];
        let content = doc.add_object(Stream::new(
            dictionary! {},
            format!("BT /F1 12 Tf 120 400 Td ({body}) Tj ET").into_bytes(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
            "Contents" => Object::Reference(content),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("fixture save");
    buf
}

/// Number of pages in a saved PDF.
pub fn page_count(path: &Path) -> usize {
    Document::load(path).expect("load output").get_pages().len()
}
