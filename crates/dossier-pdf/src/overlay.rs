//! Content-stream builders for the overlays the engine stamps onto pages:
//! the attachment frame + header, drawn index lines, folio numbers, and the
//! invisible OCR text layer.

use lopdf::Object;
use lopdf::content::Operation;

use crate::document::real;
use crate::fonts::{Face, encode_winansi};

/// Frame margin in points, as drawn by the portal era of the dossiers: a
/// 1-unit-wide rectangle one margin in from every edge.
pub const FRAME_MARGIN: f64 = 18.0;

/// Maximum header characters drawn above the frame.
pub const MAX_HEADER_CHARS: usize = 180;

/// Text rendering modes (PDF 32000-1, table 106).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Fill text normally.
    Fill,
    /// Neither fill nor stroke: invisible but selectable/searchable.
    Invisible,
}

impl RenderMode {
    fn value(self) -> i64 {
        match self {
            RenderMode::Fill => 0,
            RenderMode::Invisible => 3,
        }
    }
}

/// Operations drawing the attachment frame and its header text on a page of
/// the given size. `font_res` must already be registered on the page.
pub fn frame_and_header_ops(
    width: f64,
    height: f64,
    header: &str,
    font_res: &str,
) -> Vec<Operation> {
    let header: String = header.chars().take(MAX_HEADER_CHARS).collect();
    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new("w", vec![1.into()]),
        Operation::new(
            "re",
            vec![
                real(FRAME_MARGIN),
                real(FRAME_MARGIN),
                real(width - 2.0 * FRAME_MARGIN),
                real(height - 2.0 * FRAME_MARGIN),
            ],
        ),
        Operation::new("S", vec![]),
    ];
    ops.extend(text_ops(
        font_res,
        12.0,
        FRAME_MARGIN + 10.0,
        FRAME_MARGIN - 12.0,
        &header,
        RenderMode::Fill,
    ));
    ops.push(Operation::new("Q", vec![]));
    ops
}

/// Operations drawing `text` at `(x, y)` with the given face resource and
/// render mode. The coordinate is the text baseline, bottom-left origin.
pub fn text_ops(
    font_res: &str,
    size: f64,
    x: f64,
    y: f64,
    text: &str,
    mode: RenderMode,
) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(font_res.into()), real(size)]),
        Operation::new("Tr", vec![mode.value().into()]),
        Operation::new("Td", vec![real(x), real(y)]),
        Operation::new(
            "Tj",
            vec![Object::String(
                encode_winansi(text),
                lopdf::StringFormat::Literal,
            )],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// Operations for a right-aligned text run ending at `right_x`.
pub fn right_aligned_text_ops(
    font_res: &str,
    face: Face,
    size: f64,
    right_x: f64,
    y: f64,
    text: &str,
    mode: RenderMode,
) -> Vec<Operation> {
    let x = right_x - face.text_width(text, size);
    text_ops(font_res, size, x, y, text, mode)
}

/// Dotted leader filling `available` points, or `None` when fewer than
/// three dots fit.
pub fn leader_dots(face: Face, size: f64, available: f64) -> Option<String> {
    let dot_width = face.text_width(".", size);
    if dot_width <= 0.0 {
        return None;
    }
    let n = (available / dot_width).floor() as usize;
    if n < 3 { None } else { Some(".".repeat(n)) }
}
