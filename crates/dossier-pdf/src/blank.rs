//! Blank-page filtering.
//!
//! Scanner-fed fragments routinely carry empty backsides. A page is dropped
//! when it is structurally empty (no text, no images, no drawings) or when
//! it paints something but a raster probe reports it almost entirely white.
//! A fragment whose every page classifies as blank is left untouched: an
//! all-blank document is more likely a misclassification than a real
//! no-content fragment.

use dossier_core::PipelineConfig;
use tracing::{debug, info};

use crate::document::DocumentBuilder;
use crate::error::StageError;
use crate::text_scan::page_marks;

/// Raster-backed whiteness probe. Returns `Ok(None)` when no rasterizer is
/// available, which limits the filter to the structural check.
pub type WhitenessProbe<'a> = dyn FnMut(usize) -> Result<Option<f64>, StageError> + 'a;

/// Remove blank pages from the builder, returning how many were dropped.
pub fn filter_blank_pages(
    builder: &mut DocumentBuilder,
    cfg: &PipelineConfig,
    mut probe: Option<&mut WhitenessProbe<'_>>,
) -> Result<usize, StageError> {
    let total = builder.page_count();
    let mut blank = Vec::new();
    for index in 0..total {
        if is_blank(builder, cfg, index, probe.as_deref_mut())? {
            blank.push(index);
        }
    }

    if blank.len() == total {
        if total > 0 {
            info!(pages = total, "all pages classify as blank, keeping fragment as-is");
        }
        return Ok(0);
    }

    let removed = blank.len();
    if removed > 0 {
        builder.remove_pages(&blank);
        info!(removed, kept = builder.page_count(), "dropped blank pages");
    }
    Ok(removed)
}

fn is_blank(
    builder: &DocumentBuilder,
    cfg: &PipelineConfig,
    index: usize,
    probe: Option<&mut WhitenessProbe<'_>>,
) -> Result<bool, StageError> {
    let marks = page_marks(builder, index)?;
    if marks.is_structurally_empty() {
        debug!(page = index, "structurally empty page");
        return Ok(true);
    }
    if marks.has_text {
        return Ok(false);
    }
    // Image- or vector-only page: let the raster probe decide.
    if let Some(probe) = probe
        && let Some(ratio) = probe(index)?
    {
        debug!(page = index, ratio, "whiteness probe");
        return Ok(ratio >= cfg.blank_whiteness);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{PageSpec, blank_pdf, pdf_from_pages};

    fn cfg() -> PipelineConfig {
        PipelineConfig::default()
    }

    fn text(t: &str) -> PageSpec {
        PageSpec::Text {
            text: t.to_string(),
            x: 100.0,
            y: 400.0,
        }
    }

    #[test]
    fn drops_structurally_empty_pages() {
        let bytes = pdf_from_pages(&[text("frente"), PageSpec::Blank, text("dorso")]);
        let mut builder = DocumentBuilder::from_bytes(&bytes).unwrap();
        let removed = filter_blank_pages(&mut builder, &cfg(), None).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(builder.page_count(), 2);
    }

    #[test]
    fn all_blank_fragment_is_kept() {
        let mut builder = DocumentBuilder::from_bytes(&blank_pdf(3)).unwrap();
        let removed = filter_blank_pages(&mut builder, &cfg(), None).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(builder.page_count(), 3);
    }

    #[test]
    fn image_page_without_probe_is_kept() {
        let bytes = pdf_from_pages(&[text("hola"), PageSpec::Image]);
        let mut builder = DocumentBuilder::from_bytes(&bytes).unwrap();
        let removed = filter_blank_pages(&mut builder, &cfg(), None).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn white_image_page_is_dropped_by_probe() {
        let bytes = pdf_from_pages(&[text("hola"), PageSpec::Image]);
        let mut builder = DocumentBuilder::from_bytes(&bytes).unwrap();
        let mut probe = |index: usize| -> Result<Option<f64>, StageError> {
            Ok(Some(if index == 1 { 0.999 } else { 0.2 }))
        };
        let removed = filter_blank_pages(&mut builder, &cfg(), Some(&mut probe)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(builder.page_count(), 1);
    }

    #[test]
    fn busy_image_page_survives_probe() {
        let bytes = pdf_from_pages(&[text("hola"), PageSpec::Image]);
        let mut builder = DocumentBuilder::from_bytes(&bytes).unwrap();
        let mut probe = |_: usize| -> Result<Option<f64>, StageError> { Ok(Some(0.6)) };
        let removed = filter_blank_pages(&mut builder, &cfg(), Some(&mut probe)).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn probe_is_not_consulted_for_text_pages() {
        let bytes = pdf_from_pages(&[text("hola")]);
        let mut builder = DocumentBuilder::from_bytes(&bytes).unwrap();
        let mut calls = 0;
        let mut probe = |_: usize| -> Result<Option<f64>, StageError> {
            calls += 1;
            Ok(Some(1.0))
        };
        filter_blank_pages(&mut builder, &cfg(), Some(&mut probe)).unwrap();
        assert_eq!(calls, 0);
    }
}
