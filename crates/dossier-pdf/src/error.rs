//! Error types for the assembly engine.
//!
//! Uses [`thiserror`] for ergonomic error derivation. The taxonomy follows
//! the pipeline's degradation policy: [`StageError`] covers recoverable
//! per-stage failures that are caught and logged at the stage boundary,
//! while [`AssembleError`] covers the only conditions that abort a run
//! (failing to write the final artifact, explicit strict-mode OCR
//! unavailability, cancellation).

use thiserror::Error;

/// Recoverable failure inside one pipeline stage.
///
/// Stage errors never propagate past the stage boundary on their own; the
/// pipeline logs them and continues with whatever the stage could produce.
#[derive(Debug, Error)]
pub enum StageError {
    /// PDF container error (parse, malformed object, page tree surgery).
    #[error("PDF error: {0}")]
    Pdf(String),

    /// A fragment could not be opened or merged.
    #[error("fragment '{name}' skipped: {reason}")]
    Fragment { name: String, reason: String },

    /// Index/ToC construction failure.
    #[error("index error: {0}")]
    Toc(String),

    /// No rasterization backend is available on this system.
    #[error("no page rasterizer available ({0})")]
    RasterUnavailable(String),

    /// Rasterizing a single page failed.
    #[error("rasterization failed: {0}")]
    Raster(String),

    /// The OCR engine is not available on this system.
    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(String),

    /// OCR failed for a single page.
    #[error("OCR failed: {0}")]
    Ocr(String),

    /// No folio drawing backend succeeded.
    #[error("folio numbering failed: {0}")]
    Foliation(String),

    /// A link annotation could not be inserted.
    #[error("link annotation failed: {0}")]
    Link(String),

    /// I/O error on a working file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for StageError {
    fn from(err: lopdf::Error) -> Self {
        StageError::Pdf(err.to_string())
    }
}

/// Fatal failure of an assembly run.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// No fragment survived validation and merging; there is nothing to
    /// write.
    #[error("no fragments could be merged")]
    NothingToMerge,

    /// Writing the final document failed.
    #[error("cannot write output '{path}': {reason}")]
    WriteFailed { path: String, reason: String },

    /// The written output failed the size postcondition.
    #[error("output '{path}' is implausibly small ({size} bytes)")]
    OutputTooSmall { path: String, size: u64 },

    /// Strict mode requested and the OCR engine is unavailable.
    #[error("OCR engine unavailable and strict mode is set: {0}")]
    OcrRequired(String),

    /// The run was cancelled; no partial document is emitted.
    #[error("run cancelled")]
    Cancelled,
}
