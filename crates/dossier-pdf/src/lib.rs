//! dossier-pdf: lopdf-backed assembly engine for dossier-rs.
//!
//! This crate implements the document side of the pipeline: merging
//! fragments into one PDF, inserting the clickable index, synthesizing the
//! OCR text layer, filtering blank pages, stamping folio numbers, and
//! repairing index links. It depends on dossier-core for the value types
//! and pure algorithms.

pub mod blank;
pub mod document;
pub mod error;
pub mod foliate;
pub mod fonts;
pub mod links;
pub mod merge;
pub mod ocr;
pub mod overlay;
pub mod pipeline;
pub mod raster;
pub mod sidecar;
pub mod text_scan;
pub mod toc;

#[cfg(test)]
mod testutil;

pub use document::DocumentBuilder;
pub use error::{AssembleError, StageError};
pub use merge::{MergeOutcome, SkippedFragment};
pub use ocr::{NullOcr, OcrEngine, OcrStats, OcrWord};
pub use pipeline::{AssemblyReport, CancelToken, Pipeline};
pub use raster::{PageRasterizer, PopplerRasterizer};
pub use dossier_core;
