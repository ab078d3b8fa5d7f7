//! The assembly pipeline: ordered, single-threaded stages over one owned
//! document.
//!
//! Stage failures are logged at the stage boundary and degrade the output
//! (no index, no OCR layer, no folios) instead of aborting; only writing the
//! final artifact, strict-mode OCR unavailability, and cancellation are
//! fatal. A cancelled run discards the partial document and emits nothing.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dossier_core::{
    Fragment, FoliationPolicy, LinkMap, OcrMode, PipelineConfig, dedup_fragments, order_fragments,
};
use tracing::{info, warn};

use crate::blank::filter_blank_pages;
use crate::document::DocumentBuilder;
use crate::error::{AssembleError, StageError};
use crate::links::repair_links;
use crate::merge::{SkippedFragment, merge_fragments};
use crate::ocr::tesseract::TesseractOcr;
use crate::ocr::{OcrEngine, OcrStats, add_text_layer};
use crate::raster::{PageRasterizer, PopplerRasterizer, whiteness_ratio};
use crate::sidecar::{sidecar_path_for, write_sidecar};
use crate::toc::build_index;

/// Cooperative cancellation flag, checked between pages and stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// What one assembly run did.
#[derive(Debug, Default)]
pub struct AssemblyReport {
    /// Pages in the final document.
    pub pages: usize,
    /// Index pages inserted after the cover.
    pub idx_pages: usize,
    /// Fragments dropped at validation or merge time.
    pub skipped: Vec<SkippedFragment>,
    /// Blank pages removed across all fragments.
    pub blank_pages_removed: usize,
    /// OCR stage summary.
    pub ocr: OcrStats,
    /// Pages that received a folio number.
    pub folios_stamped: usize,
    /// Links present after the repair pass.
    pub links: usize,
    /// Size of the written output, bytes.
    pub output_size: u64,
}

/// The assembly pipeline. Backends are injectable so the whole pipeline
/// runs in tests without poppler or tesseract installed.
pub struct Pipeline {
    cfg: PipelineConfig,
    raster: Box<dyn PageRasterizer>,
    ocr: Box<dyn OcrEngine>,
    cancel: CancelToken,
}

impl Pipeline {
    /// Pipeline with the system backends (pdftoppm/mutool, tesseract).
    pub fn new(cfg: PipelineConfig) -> Self {
        Self {
            cfg,
            raster: Box::new(PopplerRasterizer),
            ocr: Box::new(TesseractOcr),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_raster(mut self, raster: Box<dyn PageRasterizer>) -> Self {
        self.raster = raster;
        self
    }

    pub fn with_ocr(mut self, ocr: Box<dyn OcrEngine>) -> Self {
        self.ocr = ocr;
        self
    }

    /// Token shared with whoever may cancel this run.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Assemble `fragments` into a dossier at `output`.
    pub fn run(
        &self,
        fragments: Vec<Fragment>,
        output: &Path,
    ) -> Result<AssemblyReport, AssembleError> {
        let workdir = tempfile::tempdir().map_err(|e| AssembleError::WriteFailed {
            path: output.display().to_string(),
            reason: format!("cannot create working directory: {e}"),
        })?;
        let result = self.run_in(fragments, output, workdir.path());
        if self.cfg.keep_work {
            let kept = workdir.keep();
            info!(path = %kept.display(), "working directory retained");
        }
        result
    }

    fn run_in(
        &self,
        fragments: Vec<Fragment>,
        output: &Path,
        workdir: &Path,
    ) -> Result<AssemblyReport, AssembleError> {
        let mut report = AssemblyReport::default();

        // Intake: boundary guarantees, then blank filtering per fragment.
        let mut accepted = Vec::with_capacity(fragments.len());
        for mut fragment in fragments {
            if let Err(reason) = fragment.validate() {
                warn!(name = %fragment.name, %reason, "fragment rejected at intake");
                report.skipped.push(SkippedFragment {
                    name: fragment.name.clone(),
                    reason: reason.to_string(),
                });
                continue;
            }
            if self.cfg.filter_blank_pages {
                match self.filter_fragment_blanks(&mut fragment, workdir, accepted.len()) {
                    Ok(removed) => report.blank_pages_removed += removed,
                    Err(e) => warn!(name = %fragment.name, error = %e, "blank filter skipped"),
                }
            }
            accepted.push(fragment);
        }

        let ordered = order_fragments(dedup_fragments(accepted));
        if self.cancel.is_cancelled() {
            return Err(AssembleError::Cancelled);
        }

        // Merge.
        let mut builder = DocumentBuilder::new();
        let outcome = merge_fragments(&mut builder, &ordered, &self.cfg)
            .map_err(|_| AssembleError::NothingToMerge)?;
        report.skipped.extend(outcome.skipped);
        if builder.page_count() == 0 {
            return Err(AssembleError::NothingToMerge);
        }

        // Index.
        let map = build_index(&mut builder, &outcome.entries);
        report.idx_pages = map.idx_pages;

        // OCR.
        if self.cfg.ocr_mode != OcrMode::Off {
            match add_text_layer(
                &mut builder,
                &self.cfg,
                &*self.raster,
                &*self.ocr,
                workdir,
                &self.cancel,
            ) {
                Ok(stats) => report.ocr = stats,
                Err(StageError::OcrUnavailable(reason)) if self.cfg.ocr_strict => {
                    return Err(AssembleError::OcrRequired(reason));
                }
                Err(e) => warn!(error = %e, "OCR stage skipped"),
            }
        }
        if self.cancel.is_cancelled() {
            return Err(AssembleError::Cancelled);
        }

        // Folios.
        if self.cfg.foliate {
            let policy = FoliationPolicy {
                skip_leading_pages: 1 + map.idx_pages,
                ..FoliationPolicy::default()
            };
            match crate::foliate::stamp_folios(&mut builder, &policy) {
                Ok(stamped) => report.folios_stamped = stamped,
                Err(e) => warn!(error = %e, "folio numbering skipped"),
            }
        }

        // Link repair, driving the map through its serialized form the same
        // way a standalone repair run would receive it.
        if !map.is_empty() {
            match round_trip_map(&map) {
                Ok(map) => match repair_links(&mut builder, &map) {
                    Ok(links) => report.links = links,
                    Err(e) => warn!(error = %e, "link repair skipped"),
                },
                Err(e) => warn!(error = %e, "link map not round-trippable"),
            }
        }

        if self.cancel.is_cancelled() {
            return Err(AssembleError::Cancelled);
        }

        // The only fatal stage: writing the artifact.
        report.pages = builder.page_count();
        let size = builder
            .save_file(output)
            .map_err(|e| AssembleError::WriteFailed {
                path: output.display().to_string(),
                reason: e.to_string(),
            })?;
        if size <= 1024 {
            return Err(AssembleError::OutputTooSmall {
                path: output.display().to_string(),
                size,
            });
        }
        report.output_size = size;

        if self.cfg.keep_toc && !map.is_empty() {
            let sidecar = sidecar_path_for(output);
            if let Err(e) = write_sidecar(&sidecar, &map) {
                warn!(error = %e, "sidecar not written");
            }
        }

        info!(
            pages = report.pages,
            idx_pages = report.idx_pages,
            size = report.output_size,
            "dossier assembled"
        );
        Ok(report)
    }

    /// Drop blank pages from one fragment, re-serializing its bytes when
    /// anything was removed.
    fn filter_fragment_blanks(
        &self,
        fragment: &mut Fragment,
        workdir: &Path,
        ordinal: usize,
    ) -> Result<usize, StageError> {
        let mut builder = DocumentBuilder::from_bytes(&fragment.bytes)?;
        let path = workdir.join(format!("frag-{ordinal}.pdf"));
        std::fs::write(&path, &fragment.bytes)?;
        let raster = &*self.raster;
        let mut probe = |page: usize| -> Result<Option<f64>, StageError> {
            // Low-DPI probe; an unavailable rasterizer limits the filter to
            // the structural check.
            match raster.rasterize(&path, page, 72, workdir) {
                Ok(image) => Ok(Some(whiteness_ratio(&image)?)),
                Err(_) => Ok(None),
            }
        };
        let removed = filter_blank_pages(&mut builder, &self.cfg, Some(&mut probe))?;
        if removed > 0 {
            fragment.bytes = builder.to_bytes()?;
        }
        Ok(removed)
    }
}

/// Encode and decode the map, proving the sidecar contract holds for it.
fn round_trip_map(map: &LinkMap) -> Result<LinkMap, StageError> {
    let json = serde_json::to_string(map).map_err(|e| StageError::Toc(e.to_string()))?;
    serde_json::from_str(&json).map_err(|e| StageError::Toc(e.to_string()))
}
