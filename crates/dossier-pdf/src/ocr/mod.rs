//! OCR text-layer synthesis.
//!
//! Pages whose body region lacks extractable text get rasterized, recognized
//! across a small rotation × language candidate grid, and overlaid with an
//! invisible text layer aligned to the page geometry. Pages that already
//! carry body text are left alone except for their header/footer bands,
//! whose words are re-inserted invisibly so the acápite stays selectable.
//!
//! The stage never changes the page count and never touches the embedded
//! page images.

pub mod tesseract;

use std::path::{Path, PathBuf};

use dossier_core::{BBox, OcrMode, PipelineConfig, body_char_count};
use lopdf::content::Operation;
use tracing::{debug, info, warn};

use crate::document::DocumentBuilder;
use crate::error::StageError;
use crate::fonts::Face;
use crate::overlay::{RenderMode, text_ops};
use crate::pipeline::CancelToken;
use crate::raster::{PageRasterizer, image_dimensions};
use crate::text_scan::page_spans;

/// One recognized word with its bounding box in rasterized-image pixel
/// space (top-left origin).
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    pub bbox: BBox,
}

/// Capability seam over the OCR runtime.
pub trait OcrEngine {
    /// Human-readable backend name, for logs.
    fn name(&self) -> &'static str;

    /// Check that the backend can run at all.
    fn probe(&self) -> Result<(), StageError>;

    /// Recognize words in `image` using the given language tag.
    fn recognize(&self, image: &Path, lang: &str) -> Result<Vec<OcrWord>, StageError>;
}

/// Always-unavailable engine, for runs with OCR disabled and for tests of
/// the degradation path.
#[derive(Debug, Default)]
pub struct NullOcr;

impl OcrEngine for NullOcr {
    fn name(&self) -> &'static str {
        "null"
    }

    fn probe(&self) -> Result<(), StageError> {
        Err(StageError::OcrUnavailable("no OCR backend".to_string()))
    }

    fn recognize(&self, _image: &Path, _lang: &str) -> Result<Vec<OcrWord>, StageError> {
        Err(StageError::OcrUnavailable("no OCR backend".to_string()))
    }
}

/// What the OCR pass did, for the run report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OcrStats {
    /// Pages examined.
    pub pages_scanned: usize,
    /// Pages that received a synthesized text layer.
    pub pages_with_layer: usize,
    /// Words inserted across the document.
    pub words_inserted: usize,
}

/// Add an invisible text layer to every page that needs one.
///
/// Propagates [`StageError::OcrUnavailable`] when the engine cannot run at
/// all; the caller decides whether that is fatal (strict mode) or a skip.
/// Per-page failures are logged and the page keeps its original content.
pub fn add_text_layer(
    builder: &mut DocumentBuilder,
    cfg: &PipelineConfig,
    raster: &dyn PageRasterizer,
    engine: &dyn OcrEngine,
    workdir: &Path,
    cancel: &CancelToken,
) -> Result<OcrStats, StageError> {
    let mut stats = OcrStats::default();
    if cfg.ocr_mode == OcrMode::Off {
        return Ok(stats);
    }
    engine.probe()?;

    // Rasterizers work on files; snapshot the assembled document once.
    let input = workdir.join("ocr-input.pdf");
    std::fs::write(&input, builder.to_bytes()?)?;

    let mode = if cfg.ocr_debug_visible {
        RenderMode::Fill
    } else {
        RenderMode::Invisible
    };

    for page in 0..builder.page_count() {
        if cancel.is_cancelled() {
            break;
        }
        stats.pages_scanned += 1;
        match synthesize_page(builder, cfg, raster, engine, workdir, &input, page, mode) {
            Ok(words) if words > 0 => {
                stats.pages_with_layer += 1;
                stats.words_inserted += words;
            }
            Ok(_) => {}
            Err(e) => warn!(page, error = %e, "page kept without text layer"),
        }
    }
    info!(
        pages = stats.pages_with_layer,
        words = stats.words_inserted,
        backend = engine.name(),
        "OCR text layer complete"
    );
    Ok(stats)
}

/// Run OCR for one page and append its text layer. Returns the number of
/// words inserted (0 when the page needed nothing).
#[allow(clippy::too_many_arguments)]
fn synthesize_page(
    builder: &mut DocumentBuilder,
    cfg: &PipelineConfig,
    raster: &dyn PageRasterizer,
    engine: &dyn OcrEngine,
    workdir: &Path,
    input: &Path,
    page: usize,
    mode: RenderMode,
) -> Result<usize, StageError> {
    let (page_w, page_h) = builder.media_box(page);
    let spans = page_spans(builder, page)?;
    let body_chars = body_char_count(&spans, page_w, page_h, cfg.body_margin_ratio);
    let needs_ocr = cfg.ocr_mode == OcrMode::Force || body_chars < cfg.page_body_min_chars;

    let image = raster.rasterize(input, page, cfg.ocr_dpi, workdir)?;

    let (words, (img_w, img_h)) = if needs_ocr {
        match best_candidate(engine, cfg, &image, workdir, page)? {
            Some(found) => found,
            None => {
                debug!(page, "no candidate produced words");
                return Ok(0);
            }
        }
    } else {
        // Body already searchable: a single upright pass feeds the
        // header/footer re-insertion.
        let dims = image_dimensions(&image)?;
        let lang = cfg.ocr_langs.first().map(String::as_str).unwrap_or("spa");
        (engine.recognize(&image, lang)?, dims)
    };
    if words.is_empty() {
        return Ok(0);
    }

    let sx = page_w / f64::from(img_w);
    let sy = page_h / f64::from(img_h);
    let band = if needs_ocr {
        None
    } else {
        Some(cfg.body_margin_ratio)
    };

    let font_res = builder.ensure_font(page, Face::Helvetica)?;
    let ops = layer_ops(&words, sx, sy, page_h, font_res, mode, band);
    if ops.is_empty() {
        return Ok(0);
    }
    let inserted = ops.len();
    let mut all = Vec::new();
    for word_ops in ops {
        all.extend(word_ops);
    }
    builder.append_content(page, all)?;
    debug!(page, words = inserted, needs_ocr, "text layer appended");
    Ok(inserted)
}

/// Sequential rotation × language search, early-stopped once a candidate
/// reaches the configured word count. When no plain candidate gets there,
/// the grid runs once more over a contrast-boosted, sharpened variant and
/// the candidate with the most words wins.
fn best_candidate(
    engine: &dyn OcrEngine,
    cfg: &PipelineConfig,
    image: &Path,
    workdir: &Path,
    page: usize,
) -> Result<Option<(Vec<OcrWord>, (u32, u32))>, StageError> {
    let mut best: Option<(Vec<OcrWord>, (u32, u32))> = None;
    if search_grid(engine, cfg, image, workdir, page, &mut best)? {
        return Ok(best);
    }
    match preprocessed_image(image, workdir, page) {
        Ok(prepped) => {
            search_grid(engine, cfg, &prepped, workdir, page, &mut best)?;
        }
        Err(e) => warn!(page, error = %e, "preprocessing retry skipped"),
    }
    Ok(best)
}

/// One pass over the rotation × language grid, folding into `best`. Returns
/// true when the best candidate reached the early-stop word count.
fn search_grid(
    engine: &dyn OcrEngine,
    cfg: &PipelineConfig,
    image: &Path,
    workdir: &Path,
    page: usize,
    best: &mut Option<(Vec<OcrWord>, (u32, u32))>,
) -> Result<bool, StageError> {
    for &rotation in &cfg.ocr_rotations {
        let candidate = match rotated_image(image, rotation, workdir) {
            Ok(path) => path,
            Err(e) => {
                warn!(page, rotation, error = %e, "rotation candidate skipped");
                continue;
            }
        };
        let dims = image_dimensions(&candidate)?;
        for lang in &cfg.ocr_langs {
            let words = match engine.recognize(&candidate, lang) {
                Ok(words) => words,
                Err(e) => {
                    debug!(page, rotation, lang = %lang, error = %e, "candidate failed");
                    continue;
                }
            };
            let better = best.as_ref().map(|(w, _)| words.len() > w.len()).unwrap_or(true);
            if better && !words.is_empty() {
                *best = Some((words, dims));
            }
            if best
                .as_ref()
                .map(|(w, _)| w.len() >= cfg.ocr_min_words)
                .unwrap_or(false)
            {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Produce the rotation candidate image, reusing the source for 0°. The
/// output name keeps the source stem so plain and preprocessed variants do
/// not clobber each other.
fn rotated_image(image: &Path, rotation: u16, workdir: &Path) -> Result<PathBuf, StageError> {
    if rotation == 0 {
        return Ok(image.to_path_buf());
    }
    let img = image::open(image).map_err(|e| StageError::Raster(format!("image decode: {e}")))?;
    let rotated = match rotation {
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        other => {
            return Err(StageError::Ocr(format!(
                "unsupported rotation candidate {other}°"
            )));
        }
    };
    let stem = image.file_stem().and_then(|s| s.to_str()).unwrap_or("page");
    let path = workdir.join(format!("rot-{rotation}-{stem}.png"));
    rotated
        .save(&path)
        .map_err(|e| StageError::Raster(format!("image save: {e}")))?;
    Ok(path)
}

/// Contrast-boosted, lightly sharpened variant for the retry pass over faint
/// or washed-out scans.
fn preprocessed_image(image: &Path, workdir: &Path, page: usize) -> Result<PathBuf, StageError> {
    let img = image::open(image).map_err(|e| StageError::Raster(format!("image decode: {e}")))?;
    let boosted = img.adjust_contrast(30.0).unsharpen(1.2, 2);
    let path = workdir.join(format!("prep-p{page}.png"));
    boosted
        .save(&path)
        .map_err(|e| StageError::Raster(format!("image save: {e}")))?;
    Ok(path)
}

/// Map each word from image space into page space and build its text ops.
/// With `band` set, only words landing in the header/footer margin bands are
/// kept.
fn layer_ops(
    words: &[OcrWord],
    sx: f64,
    sy: f64,
    page_h: f64,
    font_res: &str,
    mode: RenderMode,
    band: Option<f64>,
) -> Vec<Vec<Operation>> {
    let mut ops = Vec::new();
    for word in words {
        if word.text.trim().is_empty() {
            continue;
        }
        let x = word.bbox.x0 * sx;
        // OCR boxes are top-left origin; the page baseline sits at the
        // flipped bottom edge of the box.
        let y = page_h - word.bbox.bottom * sy;
        if let Some(ratio) = band {
            let in_band = y <= page_h * ratio || y >= page_h * (1.0 - ratio);
            if !in_band {
                continue;
            }
        }
        let size = (word.bbox.height() * sy).clamp(4.0, 72.0);
        ops.push(text_ops(font_res, size, x, y, &word.text, mode));
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{PageSpec, pdf_from_pages};
    use crate::text_scan::page_text;
    use std::cell::RefCell;

    /// Writes a fixed-size white PNG per request.
    struct FakeRaster {
        width: u32,
        height: u32,
    }

    impl FakeRaster {
        fn letter_2x() -> Self {
            Self {
                width: 1224,
                height: 1584,
            }
        }
    }

    impl PageRasterizer for FakeRaster {
        fn rasterize(
            &self,
            _pdf_path: &Path,
            page: usize,
            _dpi: u32,
            workdir: &Path,
        ) -> Result<PathBuf, StageError> {
            let path = workdir.join(format!("fake-{page}.png"));
            let img = image::GrayImage::from_pixel(self.width, self.height, image::Luma([255]));
            img.save(&path)
                .map_err(|e| StageError::Raster(e.to_string()))?;
            Ok(path)
        }
    }

    /// Returns a canned word list and counts recognize calls.
    struct FakeOcr {
        words: Vec<OcrWord>,
        calls: RefCell<usize>,
    }

    impl FakeOcr {
        fn with_words(words: Vec<OcrWord>) -> Self {
            Self {
                words,
                calls: RefCell::new(0),
            }
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
            *self.calls.borrow_mut() += 1;
            Ok(self.words.clone())
        }
    }

    /// Recognizes words only on preprocessed candidate images, like a faint
    /// scan that needs the contrast boost.
    struct FaintScanOcr {
        words: Vec<OcrWord>,
        calls: RefCell<usize>,
    }

    impl OcrEngine for FaintScanOcr {
        fn name(&self) -> &'static str {
            "fake-faint"
        }

        fn probe(&self) -> Result<(), StageError> {
            Ok(())
        }

        fn recognize(&self, image: &Path, _lang: &str) -> Result<Vec<OcrWord>, StageError> {
            *self.calls.borrow_mut() += 1;
            let name = image.file_name().and_then(|s| s.to_str()).unwrap_or("");
            if name.contains("prep-") {
                Ok(self.words.clone())
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn word(text: &str, x0: f64, top: f64) -> OcrWord {
        OcrWord {
            text: text.to_string(),
            bbox: BBox::new(x0, top, x0 + 200.0, top + 30.0),
        }
    }

    fn body_words(n: usize) -> Vec<OcrWord> {
        (0..n)
            .map(|i| word(&format!("palabra{i}"), 300.0, 500.0 + 40.0 * i as f64))
            .collect()
    }

    fn image_doc() -> DocumentBuilder {
        DocumentBuilder::from_bytes(&pdf_from_pages(&[PageSpec::Image])).unwrap()
    }

    fn text_doc(text: &str) -> DocumentBuilder {
        DocumentBuilder::from_bytes(&pdf_from_pages(&[PageSpec::Text {
            text: text.to_string(),
            x: 150.0,
            y: 400.0,
        }]))
        .unwrap()
    }

    #[test]
    fn image_page_gains_searchable_text() {
        let mut builder = image_doc();
        let engine = FakeOcr::with_words(body_words(12));
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancelToken::new();
        let stats = add_text_layer(
            &mut builder,
            &PipelineConfig::default(),
            &FakeRaster::letter_2x(),
            &engine,
            dir.path(),
            &cancel,
        )
        .unwrap();
        assert_eq!(stats.pages_with_layer, 1);
        assert_eq!(builder.page_count(), 1);
        let text = page_text(&builder, 0).unwrap();
        assert!(text.contains("palabra0"), "{text}");
    }

    #[test]
    fn body_text_page_gets_no_body_layer() {
        let body = "texto del decreto con suficiente contenido para el umbral de caracteres";
        let mut builder = text_doc(body);
        // The fake reports words in the body region; none may land.
        let engine = FakeOcr::with_words(body_words(12));
        let dir = tempfile::tempdir().unwrap();
        let stats = add_text_layer(
            &mut builder,
            &PipelineConfig::default(),
            &FakeRaster::letter_2x(),
            &engine,
            dir.path(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(stats.words_inserted, 0);
        assert!(!page_text(&builder, 0).unwrap().contains("palabra0"));
    }

    #[test]
    fn header_band_words_reinserted_on_text_pages() {
        let body = "texto del decreto con suficiente contenido para el umbral de caracteres";
        let mut builder = text_doc(body);
        // Word near the top of the 1584px image maps into the header band.
        let engine = FakeOcr::with_words(vec![word("ACAPITE", 300.0, 40.0)]);
        let dir = tempfile::tempdir().unwrap();
        let stats = add_text_layer(
            &mut builder,
            &PipelineConfig::default(),
            &FakeRaster::letter_2x(),
            &engine,
            dir.path(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(stats.words_inserted, 1);
        assert!(page_text(&builder, 0).unwrap().contains("ACAPITE"));
    }

    #[test]
    fn early_stop_limits_candidate_search() {
        let mut builder = image_doc();
        let engine = FakeOcr::with_words(body_words(20));
        let dir = tempfile::tempdir().unwrap();
        add_text_layer(
            &mut builder,
            &PipelineConfig::default(),
            &FakeRaster::letter_2x(),
            &engine,
            dir.path(),
            &CancelToken::new(),
        )
        .unwrap();
        // 20 words beat the default early-stop threshold on the first
        // rotation+language candidate.
        assert_eq!(*engine.calls.borrow(), 1);
    }

    #[test]
    fn faint_scan_recovered_by_preprocessing_retry() {
        let mut builder = image_doc();
        let engine = FaintScanOcr {
            words: body_words(12),
            calls: RefCell::new(0),
        };
        let dir = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig::default();
        let stats = add_text_layer(
            &mut builder,
            &cfg,
            &FakeRaster::letter_2x(),
            &engine,
            dir.path(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(stats.pages_with_layer, 1);
        assert_eq!(stats.words_inserted, 12);
        // The plain grid was exhausted before the retry produced words.
        let plain_grid = cfg.ocr_rotations.len() * cfg.ocr_langs.len();
        assert!(*engine.calls.borrow() > plain_grid);
        assert!(page_text(&builder, 0).unwrap().contains("palabra0"));
    }

    #[test]
    fn zero_words_keeps_page_untouched() {
        let mut builder = image_doc();
        let engine = FakeOcr::with_words(Vec::new());
        let dir = tempfile::tempdir().unwrap();
        let stats = add_text_layer(
            &mut builder,
            &PipelineConfig::default(),
            &FakeRaster::letter_2x(),
            &engine,
            dir.path(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(stats.pages_with_layer, 0);
        assert_eq!(builder.page_count(), 1);
    }

    #[test]
    fn off_mode_skips_everything() {
        let mut builder = image_doc();
        let engine = FakeOcr::with_words(body_words(5));
        let dir = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig {
            ocr_mode: OcrMode::Off,
            ..PipelineConfig::default()
        };
        let stats = add_text_layer(
            &mut builder,
            &cfg,
            &FakeRaster::letter_2x(),
            &engine,
            dir.path(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(stats.pages_scanned, 0);
        assert_eq!(*engine.calls.borrow(), 0);
    }

    #[test]
    fn unavailable_engine_propagates() {
        let mut builder = image_doc();
        let dir = tempfile::tempdir().unwrap();
        let err = add_text_layer(
            &mut builder,
            &PipelineConfig::default(),
            &FakeRaster::letter_2x(),
            &NullOcr,
            dir.path(),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, StageError::OcrUnavailable(_)));
    }

    #[test]
    fn cancelled_run_stops_between_pages() {
        let bytes = pdf_from_pages(&[PageSpec::Image, PageSpec::Image]);
        let mut builder = DocumentBuilder::from_bytes(&bytes).unwrap();
        let engine = FakeOcr::with_words(body_words(12));
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let stats = add_text_layer(
            &mut builder,
            &PipelineConfig::default(),
            &FakeRaster::letter_2x(),
            &engine,
            dir.path(),
            &cancel,
        )
        .unwrap();
        assert_eq!(stats.pages_scanned, 0);
    }
}
