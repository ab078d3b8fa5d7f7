//! Pipeline configuration.
//!
//! All process-wide tunables are collected into one immutable
//! [`PipelineConfig`] passed into the pipeline constructor; nothing in the
//! engine reads ambient state. The CLI populates this struct from flags and
//! environment variables.

/// When to synthesize an OCR text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OcrMode {
    /// Never run OCR.
    Off,
    /// OCR only pages whose body region lacks extractable text.
    #[default]
    Auto,
    /// OCR every page.
    Force,
}

impl OcrMode {
    /// Parse the `OCR_MODE` environment value. Unknown values fall back to
    /// `Auto`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "0" | "no" => OcrMode::Off,
            "force" | "all" => OcrMode::Force,
            _ => OcrMode::Auto,
        }
    }
}

/// Immutable configuration for one assembly run.
///
/// The whiteness and early-stop thresholds are empirically tuned for the
/// dossier document style; they are fields rather than constants so callers
/// can adjust them per corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// OCR trigger policy.
    pub ocr_mode: OcrMode,
    /// Rasterization resolution for OCR, dots per inch.
    pub ocr_dpi: u32,
    /// Ordered language tags tried per page, passed verbatim to the engine.
    pub ocr_langs: Vec<String>,
    /// Rotation candidates tried per page, degrees clockwise.
    pub ocr_rotations: Vec<u16>,
    /// Recognized-word count at which the candidate search stops early.
    pub ocr_min_words: usize,
    /// Hard-fail the run when the OCR engine is unavailable.
    pub ocr_strict: bool,
    /// Render the synthesized text visibly instead of invisibly (debug).
    pub ocr_debug_visible: bool,
    /// Minimum extractable characters in the body region for a page to count
    /// as already searchable.
    pub page_body_min_chars: usize,
    /// Fraction of each page edge treated as header/footer margin when
    /// classifying body text.
    pub body_margin_ratio: f64,
    /// Stamp the per-fragment header frame on attachment pages.
    pub stamp_headers: bool,
    /// Stamp folio numbers.
    pub foliate: bool,
    /// Drop visually empty pages from fragments before merging.
    pub filter_blank_pages: bool,
    /// Whiteness ratio at or above which a structurally empty page counts as
    /// blank.
    pub blank_whiteness: f64,
    /// Retain the LinkMap sidecar next to the output.
    pub keep_toc: bool,
    /// Retain the temporary working directory (debugging).
    pub keep_work: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr_mode: OcrMode::Auto,
            ocr_dpi: 300,
            ocr_langs: vec!["spa".to_string(), "eng".to_string()],
            ocr_rotations: vec![0, 90, 270],
            ocr_min_words: 10,
            ocr_strict: false,
            ocr_debug_visible: false,
            page_body_min_chars: 32,
            body_margin_ratio: 0.13,
            stamp_headers: true,
            foliate: true,
            filter_blank_pages: true,
            blank_whiteness: 0.995,
            keep_toc: false,
            keep_work: false,
        }
    }
}
