//! Positioned text extraction from page content streams.
//!
//! The assembly passes only need to know roughly *where* text sits on a page
//! (body vs. header/footer band) and *what* it says (índice markers, blank
//! detection), so this is a deliberately small content-stream walk: it
//! tracks the text cursor through `Tm`/`Td`/`TD`/`T*`/`TL` and records one
//! span per show operator. It is not a full interpreter — no CTM
//! composition, no font-programme decoding — which is sufficient for the
//! WinAnsi-encoded overlays this engine writes and for the portal-rendered
//! fragments it consumes.

use dossier_core::PositionedSpan;
use lopdf::Object;
use lopdf::content::Content;

use crate::document::{DocumentBuilder, object_to_f64};
use crate::error::StageError;

/// Structural content observed on a page, for blank-page classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageMarks {
    /// The page shows at least one non-whitespace text span.
    pub has_text: bool,
    /// The page invokes an XObject or carries an inline image.
    pub has_images: bool,
    /// The page paints at least one vector path or shading.
    pub has_drawings: bool,
}

impl PageMarks {
    /// A page with none of the marks is structurally empty.
    pub fn is_structurally_empty(&self) -> bool {
        !self.has_text && !self.has_images && !self.has_drawings
    }
}

/// Extract positioned text spans from the page at `index`.
pub fn page_spans(builder: &DocumentBuilder, index: usize) -> Result<Vec<PositionedSpan>, StageError> {
    let data = builder.page_content(index)?;
    let content =
        Content::decode(&data).map_err(|e| StageError::Pdf(format!("content decode: {e}")))?;

    let mut spans = Vec::new();
    let mut x = 0.0_f64;
    let mut y = 0.0_f64;
    let mut leading = 0.0_f64;

    for op in &content.operations {
        match op.operator.as_str() {
            "BT" => {
                x = 0.0;
                y = 0.0;
            }
            "Tm" => {
                if op.operands.len() == 6 {
                    x = object_to_f64(&op.operands[4]);
                    y = object_to_f64(&op.operands[5]);
                }
            }
            "Td" => {
                if op.operands.len() == 2 {
                    x += object_to_f64(&op.operands[0]);
                    y += object_to_f64(&op.operands[1]);
                }
            }
            "TD" => {
                if op.operands.len() == 2 {
                    x += object_to_f64(&op.operands[0]);
                    let ty = object_to_f64(&op.operands[1]);
                    y += ty;
                    leading = -ty;
                }
            }
            "TL" => {
                if let Some(operand) = op.operands.first() {
                    leading = object_to_f64(operand);
                }
            }
            "T*" => y -= leading,
            "Tj" | "'" => {
                if op.operator == "'" {
                    y -= leading;
                }
                if let Some(text) = string_operand(op.operands.first()) {
                    push_span(&mut spans, text, x, y);
                }
            }
            "\"" => {
                y -= leading;
                if let Some(text) = string_operand(op.operands.get(2)) {
                    push_span(&mut spans, text, x, y);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    let text: String = items
                        .iter()
                        .filter_map(|item| match item {
                            Object::String(bytes, _) => Some(decode_pdf_text(bytes)),
                            _ => None,
                        })
                        .collect();
                    push_span(&mut spans, text, x, y);
                }
            }
            _ => {}
        }
    }
    Ok(spans)
}

/// All text on the page joined with spaces.
pub fn page_text(builder: &DocumentBuilder, index: usize) -> Result<String, StageError> {
    let spans = page_spans(builder, index)?;
    Ok(spans
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" "))
}

/// Classify the structural content of the page at `index`.
pub fn page_marks(builder: &DocumentBuilder, index: usize) -> Result<PageMarks, StageError> {
    let data = builder.page_content(index)?;
    let content =
        Content::decode(&data).map_err(|e| StageError::Pdf(format!("content decode: {e}")))?;

    let mut marks = PageMarks::default();
    for op in &content.operations {
        match op.operator.as_str() {
            "Do" | "BI" => marks.has_images = true,
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" | "sh" => {
                marks.has_drawings = true
            }
            "Tj" | "'" | "\"" | "TJ" => {
                // Only count shows that produce visible characters.
                let text = match op.operator.as_str() {
                    "TJ" => match op.operands.first() {
                        Some(Object::Array(items)) => items
                            .iter()
                            .filter_map(|item| match item {
                                Object::String(bytes, _) => Some(decode_pdf_text(bytes)),
                                _ => None,
                            })
                            .collect(),
                        _ => String::new(),
                    },
                    "\"" => string_operand(op.operands.get(2)).unwrap_or_default(),
                    _ => string_operand(op.operands.first()).unwrap_or_default(),
                };
                if !text.trim().is_empty() {
                    marks.has_text = true;
                }
            }
            _ => {}
        }
    }
    Ok(marks)
}

fn push_span(spans: &mut Vec<PositionedSpan>, text: String, x: f64, y: f64) {
    if !text.trim().is_empty() {
        spans.push(PositionedSpan::new(text, x, y));
    }
}

fn string_operand(obj: Option<&Object>) -> Option<String> {
    match obj {
        Some(Object::String(bytes, _)) => Some(decode_pdf_text(bytes)),
        _ => None,
    }
}

/// Decode show-operator bytes. The engine writes WinAnsi, whose printable
/// range coincides with Latin-1 for everything the dossiers use.
fn decode_pdf_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
