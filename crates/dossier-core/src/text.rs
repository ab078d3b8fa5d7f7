//! Text classification helpers shared by the OCR synthesizer, the blank page
//! filter, and the folio stamper.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// A run of extracted text anchored at its drawing position, in PDF points
/// with a bottom-left origin.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedSpan {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

impl PositionedSpan {
    pub fn new(text: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            text: text.into(),
            x,
            y,
        }
    }
}

/// Strip diacritics and lowercase: "ÍNDICE" → "indice".
pub fn fold_diacritics(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Whether page text marks a structural index page that must never receive a
/// folio number.
pub fn is_index_page_text(text: &str) -> bool {
    fold_diacritics(text)
        .split_whitespace()
        .any(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == "indice")
}

/// Count the non-whitespace characters of spans anchored inside the body
/// region of a page, excluding a `margin_ratio` band on each edge (which is
/// where headers, footers and stamped frames live).
pub fn body_char_count(
    spans: &[PositionedSpan],
    page_width: f64,
    page_height: f64,
    margin_ratio: f64,
) -> usize {
    let x_min = page_width * margin_ratio;
    let x_max = page_width * (1.0 - margin_ratio);
    let y_min = page_height * margin_ratio;
    let y_max = page_height * (1.0 - margin_ratio);
    spans
        .iter()
        .filter(|s| s.x >= x_min && s.x <= x_max && s.y >= y_min && s.y <= y_max)
        .map(|s| s.text.chars().filter(|c| !c.is_whitespace()).count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_strips_accents_and_case() {
        assert_eq!(fold_diacritics("ÍNDICE"), "indice");
        assert_eq!(fold_diacritics("Pericia Médica"), "pericia medica");
    }

    #[test]
    fn index_marker_detected_with_diacritics() {
        assert!(is_index_page_text("ÍNDICE"));
        assert!(is_index_page_text("— Índice —"));
        assert!(is_index_page_text("indice de operaciones"));
    }

    #[test]
    fn index_marker_requires_whole_word() {
        assert!(!is_index_page_text("reindice los valores"));
        assert!(!is_index_page_text("sin marcador"));
    }

    #[test]
    fn body_count_excludes_margin_bands() {
        let spans = vec![
            // Header band: near the top edge of a 612x792 page.
            PositionedSpan::new("EXPEDIENTE 1234", 100.0, 770.0),
            // Body.
            PositionedSpan::new("texto del decreto", 100.0, 400.0),
            // Footer band.
            PositionedSpan::new("página 3", 100.0, 20.0),
        ];
        let count = body_char_count(&spans, 612.0, 792.0, 0.13);
        assert_eq!(count, "textodeldecreto".len());
    }

    #[test]
    fn body_count_empty_page_is_zero() {
        assert_eq!(body_char_count(&[], 612.0, 792.0, 0.13), 0);
    }
}
