//! In-memory PDF fixtures for unit tests, built directly with lopdf.

use lopdf::{Document, Object, Stream, dictionary};

/// One-page 612x792 PDF showing `text` at `(x, y)` in Helvetica 12.
pub fn text_page_pdf(text: &str, x: f64, y: f64) -> Vec<u8> {
    pdf_from_pages(&[PageSpec::Text {
        text: text.to_string(),
        x,
        y,
    }])
}

/// PDF with `n` pages, each carrying a distinct body-text line.
pub fn pdf_with_pages(n: usize) -> Vec<u8> {
    let specs: Vec<PageSpec> = (0..n)
        .map(|i| PageSpec::Text {
            text: format!("cuerpo de la página {}", i + 1),
            x: 100.0,
            y: 400.0,
        })
        .collect();
    pdf_from_pages(&specs)
}

/// One-page PDF with an empty content stream.
pub fn blank_page_pdf() -> Vec<u8> {
    pdf_from_pages(&[PageSpec::Blank])
}

/// PDF whose pages are all blank.
pub fn blank_pdf(n: usize) -> Vec<u8> {
    pdf_from_pages(&vec![PageSpec::Blank; n])
}

/// One-page PDF with a full-page image XObject and no text.
pub fn image_page_pdf() -> Vec<u8> {
    pdf_from_pages(&[PageSpec::Image])
}

/// PDF with one page per spec.
pub fn pdf_from_pages(specs: &[PageSpec]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for spec in specs {
        let (content, resources) = match spec {
            PageSpec::Blank => (Vec::new(), dictionary! {}),
            PageSpec::Text { text, x, y } => {
                let encoded: Vec<u8> = text.chars().map(|c| if (c as u32) < 256 { c as u8 } else { b'?' }).collect();
                let mut stream = Vec::new();
                stream.extend_from_slice(b"BT /F1 12 Tf ");
                stream.extend_from_slice(format!("{x} {y} Td (").as_bytes());
                for b in encoded {
                    match b {
                        b'(' | b')' | b'\\' => {
                            stream.push(b'\\');
                            stream.push(b);
                        }
                        _ => stream.push(b),
                    }
                }
                stream.extend_from_slice(b") Tj ET");
                (
                    stream,
                    dictionary! {
                        "Font" => dictionary! { "F1" => Object::Reference(font_id) },
                    },
                )
            }
            PageSpec::Image => {
                // 2x2 gray raster, drawn across the whole page.
                let image = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => 2,
                        "Height" => 2,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                    },
                    vec![0x40, 0x80, 0xc0, 0xff],
                );
                let image_id = doc.add_object(image);
                (
                    b"q 612 0 0 792 0 0 cm /Im1 Do Q".to_vec(),
                    dictionary! {
                        "XObject" => dictionary! { "Im1" => Object::Reference(image_id) },
                    },
                )
            }
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources,
            "Contents" => Object::Reference(content_id),
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

/// Page content recipe for [`pdf_from_pages`].
#[derive(Debug, Clone)]
pub enum PageSpec {
    Blank,
    Text { text: String, x: f64, y: f64 },
    Image,
}
