//! Folio ("foja") number stamping.
//!
//! Eligible pages get a right-aligned leaf number near the top margin.
//! Pages carrying the word "índice" in their text are structural and never
//! numbered, regardless of position. Stamping goes through a fallback chain
//! of drawing backends; if every backend fails the pass is skipped and
//! logged, never fatal. The pass never changes the page count.

use dossier_core::{FoliationPolicy, is_index_page_text};
use lopdf::dictionary;
use tracing::{info, warn};

use crate::document::{DocumentBuilder, real};
use crate::error::StageError;
use crate::fonts::Face;
use crate::overlay::{RenderMode, right_aligned_text_ops};
use crate::text_scan::page_text;

/// Distance of the number's right edge from the page's right edge.
const RIGHT_INSET: f64 = 36.0;
/// Distance of the number's baseline from the top edge.
const TOP_DROP: f64 = 30.0;
const FOLIO_SIZE: f64 = 11.0;

/// A way of drawing a folio label onto a page.
pub trait FolioBackend {
    fn name(&self) -> &'static str;

    /// Draw `label` near the top-right corner of the page at `index`.
    fn stamp(
        &self,
        builder: &mut DocumentBuilder,
        index: usize,
        label: &str,
    ) -> Result<(), StageError>;
}

/// Primary backend: bold text appended to the page content stream.
#[derive(Debug, Default)]
pub struct OverlayBackend;

impl FolioBackend for OverlayBackend {
    fn name(&self) -> &'static str {
        "overlay"
    }

    fn stamp(
        &self,
        builder: &mut DocumentBuilder,
        index: usize,
        label: &str,
    ) -> Result<(), StageError> {
        let (w, h) = builder.media_box(index);
        let font_res = builder.ensure_font(index, Face::HelveticaBold)?;
        builder.append_content(
            index,
            right_aligned_text_ops(
                font_res,
                Face::HelveticaBold,
                FOLIO_SIZE,
                w - RIGHT_INSET,
                h - TOP_DROP,
                label,
                RenderMode::Fill,
            ),
        )
    }
}

/// Fallback backend: a FreeText annotation, equivalent visual result for
/// viewers that honor annotation appearance defaults.
#[derive(Debug, Default)]
pub struct AnnotationBackend;

impl FolioBackend for AnnotationBackend {
    fn name(&self) -> &'static str {
        "freetext"
    }

    fn stamp(
        &self,
        builder: &mut DocumentBuilder,
        index: usize,
        label: &str,
    ) -> Result<(), StageError> {
        let (w, h) = builder.media_box(index);
        let width = Face::HelveticaBold.text_width(label, FOLIO_SIZE) + 4.0;
        builder.push_annotation(
            index,
            dictionary! {
                "Type" => "Annot",
                "Subtype" => "FreeText",
                "Rect" => vec![
                    real(w - RIGHT_INSET - width),
                    real(h - TOP_DROP - 4.0),
                    real(w - RIGHT_INSET),
                    real(h - TOP_DROP + FOLIO_SIZE),
                ],
                "Contents" => lopdf::Object::string_literal(label),
                "DA" => lopdf::Object::string_literal("/Helv 11 Tf 0 g"),
                "Border" => vec![0.into(), 0.into(), 0.into()],
            },
        )
    }
}

/// Stamp folio numbers over the whole document with the default backend
/// chain.
pub fn stamp_folios(
    builder: &mut DocumentBuilder,
    policy: &FoliationPolicy,
) -> Result<usize, StageError> {
    stamp_folios_with(
        builder,
        policy,
        &[&OverlayBackend, &AnnotationBackend],
    )
}

/// Stamp folio numbers using an explicit backend chain, tried per page in
/// order until one succeeds.
pub fn stamp_folios_with(
    builder: &mut DocumentBuilder,
    policy: &FoliationPolicy,
    backends: &[&dyn FolioBackend],
) -> Result<usize, StageError> {
    let mut stamped = 0;
    for page in 0..builder.page_count() {
        let Some(value) = policy.folio_value(page) else {
            continue;
        };
        let text = page_text(builder, page).unwrap_or_default();
        if is_index_page_text(&text) {
            continue;
        }
        let label = match &policy.fixed_text {
            Some(prefix) => format!("{prefix} {value}"),
            None => value.to_string(),
        };
        let mut done = false;
        for backend in backends {
            match backend.stamp(builder, page, &label) {
                Ok(()) => {
                    done = true;
                    break;
                }
                Err(e) => {
                    warn!(page, backend = backend.name(), error = %e, "folio backend failed");
                }
            }
        }
        if done {
            stamped += 1;
        } else {
            warn!(page, "no folio backend succeeded, page left unnumbered");
        }
    }
    info!(stamped, "folio numbering complete");
    Ok(stamped)
}
