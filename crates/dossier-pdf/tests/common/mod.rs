//! Shared fixtures for the assembly integration tests: in-memory PDFs built
//! with lopdf, plus fake raster/OCR backends so the pipeline runs without
//! poppler or tesseract.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use dossier_pdf::dossier_core::BBox;
use dossier_pdf::{OcrEngine, OcrWord, PageRasterizer, StageError};
use lopdf::{Document, Object, Stream, dictionary};

/// Recipe for one fixture page.
#[derive(Debug, Clone)]
pub enum Page {
    Blank,
    Text(&'static str),
    Image,
}

/// Build a PDF with the given pages (612x792, Helvetica 12 body text at a
/// fixed body position).
pub fn pdf(pages: &[Page]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for page in pages {
        let (content, resources) = match page {
            Page::Blank => (Vec::new(), dictionary! {}),
            Page::Text(text) => (
                format!("BT /F1 12 Tf 120 400 Td ({text}) Tj ET").into_bytes(),
                dictionary! {
                    "Font" => dictionary! { "F1" => Object::Reference(font_id) },
                },
            ),
            Page::Image => {
                let image = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => 2,
                        "Height" => 2,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                    },
                    vec![0x30, 0x70, 0xb0, 0xf0],
                ));
                (
                    b"q 612 0 0 792 0 0 cm /Im1 Do Q".to_vec(),
                    dictionary! {
                        "XObject" => dictionary! { "Im1" => Object::Reference(image) },
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

/// Multi-page PDF where every page carries distinct letters-only body text.
pub fn text_pdf(n: usize) -> Vec<u8> {
    const BODIES: [&str; 8] = [
        "cuerpo alfa", "cuerpo beta", "cuerpo gamma", "cuerpo delta", "cuerpo epsilon",
        "cuerpo zeta", "cuerpo eta", "cuerpo theta",
    ];
    let pages: Vec<Page> = (0..n).map(|i| Page::Text(BODIES[i % BODIES.len()])).collect();
    pdf(&pages)
}

/// Rasterizer that writes a mid-gray PNG at exactly twice the page size.
/// Gray, not white, so the blank filter's whiteness probe never classifies
/// fixture pages as blank.
pub struct FakeRaster;

impl PageRasterizer for FakeRaster {
    fn rasterize(
        &self,
        _pdf_path: &Path,
        page: usize,
        _dpi: u32,
        workdir: &Path,
    ) -> Result<PathBuf, StageError> {
        let path = workdir.join(format!("fake-{page}.png"));
        let img = image::GrayImage::from_pixel(1224, 1584, image::Luma([128]));
        img.save(&path)
            .map_err(|e| StageError::Raster(e.to_string()))?;
        Ok(path)
    }
}

/// OCR engine that returns the same body-region word list for every page.
pub struct FakeOcr {
    pub words: Vec<OcrWord>,
}

impl FakeOcr {
    pub fn phrase(words: &[&str]) -> Self {
        let words = words
            .iter()
            .enumerate()
            .map(|(i, text)| OcrWord {
                text: (*text).to_string(),
                bbox: BBox::new(
                    300.0 + 220.0 * (i % 3) as f64,
                    500.0 + 50.0 * (i / 3) as f64,
                    480.0 + 220.0 * (i % 3) as f64,
                    534.0 + 50.0 * (i / 3) as f64,
                ),
            })
            .collect();
        Self { words }
    }
}

impl OcrEngine for FakeOcr {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn probe(&self) -> Result<(), StageError> {
        Ok(())
    }

    fn recognize(&self, _image: &Path, _lang: &str) -> Result<Vec<OcrWord>, StageError> {
        Ok(self.words.clone())
    }
}
