//! Fragment merging: appends each fragment's pages to the builder, stamps
//! the attachment frame + header, and records the index entries the table of
//! contents is built from.
//!
//! A fragment that fails to load is skipped and logged; one corrupt
//! attachment must not sink the whole dossier.

use std::collections::HashMap;

use dossier_core::{Fragment, IndexEntry, PipelineConfig};
use lopdf::ObjectId;
use tracing::{info, warn};

use crate::document::DocumentBuilder;
use crate::error::StageError;
use crate::fonts::Face;
use crate::overlay::frame_and_header_ops;

/// A fragment the merge pass dropped, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedFragment {
    pub name: String,
    pub reason: String,
}

/// Result of the merge pass.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// One entry per merged fragment after the cover sheet, pointing at the
    /// 0-based page where the fragment starts in the merged document.
    pub entries: Vec<IndexEntry>,
    /// Fragments that could not be merged.
    pub skipped: Vec<SkippedFragment>,
}

/// Merge fragments into the builder in the order given.
///
/// The first fragment is the cover sheet and gets no index entry. Fragments
/// carrying a header text get the frame + header stamped on every page they
/// contribute; the stamped overlay is shared between same-size pages of the
/// same fragment.
pub fn merge_fragments(
    builder: &mut DocumentBuilder,
    fragments: &[Fragment],
    cfg: &PipelineConfig,
) -> Result<MergeOutcome, StageError> {
    let mut outcome = MergeOutcome::default();
    let mut merged_any = false;

    for fragment in fragments {
        let indices = match builder.append_pdf_bytes(&fragment.bytes) {
            Ok(indices) => indices,
            Err(e) => {
                warn!(name = %fragment.name, error = %e, "skipping unreadable fragment");
                outcome.skipped.push(SkippedFragment {
                    name: fragment.name.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if indices.is_empty() {
            warn!(name = %fragment.name, "skipping fragment with no pages");
            outcome.skipped.push(SkippedFragment {
                name: fragment.name.clone(),
                reason: "fragment has no pages".to_string(),
            });
            continue;
        }

        if cfg.stamp_headers
            && let Some(header) = fragment.header_text.as_deref()
            && let Err(e) = stamp_header(builder, &indices, header)
        {
            warn!(name = %fragment.name, error = %e, "header stamp failed, pages kept bare");
        }

        if merged_any {
            outcome
                .entries
                .push(IndexEntry::new(fragment.display_title(), indices[0]));
        }
        merged_any = true;
        info!(name = %fragment.name, pages = indices.len(), "merged fragment");
    }

    Ok(outcome)
}

/// Stamp the frame + header on every page of one fragment, interning one
/// overlay stream per distinct page size.
fn stamp_header(
    builder: &mut DocumentBuilder,
    indices: &[usize],
    header: &str,
) -> Result<(), StageError> {
    let mut cache: HashMap<(u64, u64), ObjectId> = HashMap::new();
    for &index in indices {
        let font_res = builder.ensure_font(index, Face::HelveticaBold)?;
        let (w, h) = builder.media_box(index);
        let key = (w.to_bits(), h.to_bits());
        let overlay = match cache.get(&key) {
            Some(id) => *id,
            None => {
                let ops = frame_and_header_ops(w, h, header, font_res);
                let id = builder.intern_content(ops)?;
                cache.insert(key, id);
                id
            }
        };
        builder.append_content_ref(index, overlay)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::pdf_with_pages;
    use crate::text_scan::page_text;

    fn cfg() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn merge_appends_in_order_and_indexes_after_cover() {
        let mut builder = DocumentBuilder::new();
        let fragments = vec![
            Fragment::new(pdf_with_pages(2), "caratula.pdf"),
            Fragment::new(pdf_with_pages(3), "actuacion-1.pdf"),
            Fragment::new(pdf_with_pages(1), "actuacion-2.pdf"),
        ];
        let outcome = merge_fragments(&mut builder, &fragments, &cfg()).unwrap();
        assert_eq!(builder.page_count(), 6);
        assert_eq!(outcome.entries.len(), 2);
        assert_eq!(outcome.entries[0].start_page, 2);
        assert_eq!(outcome.entries[1].start_page, 5);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn unreadable_fragment_is_skipped_not_fatal() {
        let mut builder = DocumentBuilder::new();
        let fragments = vec![
            Fragment::new(pdf_with_pages(1), "caratula.pdf"),
            Fragment::new(b"%PDF-1.4 truncated garbage".to_vec(), "roto.pdf"),
            Fragment::new(pdf_with_pages(2), "adjunto.pdf"),
        ];
        let outcome = merge_fragments(&mut builder, &fragments, &cfg()).unwrap();
        assert_eq!(builder.page_count(), 3);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].name, "roto.pdf");
        // The surviving attachment still gets its entry at the right page.
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].start_page, 1);
    }

    #[test]
    fn header_text_is_stamped_on_attachment_pages() {
        let mut builder = DocumentBuilder::new();
        let fragments = vec![
            Fragment::new(pdf_with_pages(1), "caratula.pdf"),
            Fragment::new(pdf_with_pages(2), "pericia.pdf")
                .with_header("ADJUNTO · Pericia · pericia.pdf"),
        ];
        merge_fragments(&mut builder, &fragments, &cfg()).unwrap();
        for page in [1, 2] {
            let text = page_text(&builder, page).unwrap();
            assert!(text.contains("ADJUNTO"), "page {page}: {text}");
        }
        // Cover page is untouched.
        assert!(!page_text(&builder, 0).unwrap().contains("ADJUNTO"));
    }

    #[test]
    fn stamping_can_be_disabled() {
        let mut builder = DocumentBuilder::new();
        let fragments = vec![
            Fragment::new(pdf_with_pages(1), "caratula.pdf"),
            Fragment::new(pdf_with_pages(1), "pericia.pdf").with_header("ADJUNTO · pericia.pdf"),
        ];
        let mut cfg = cfg();
        cfg.stamp_headers = false;
        merge_fragments(&mut builder, &fragments, &cfg).unwrap();
        assert!(!page_text(&builder, 1).unwrap().contains("ADJUNTO"));
    }

    #[test]
    fn entry_titles_use_display_title() {
        let mut builder = DocumentBuilder::new();
        let fragments = vec![
            Fragment::new(pdf_with_pages(1), "caratula.pdf"),
            Fragment::new(pdf_with_pages(1), "a.pdf").with_toc_title("Oficio al banco"),
        ];
        let outcome = merge_fragments(&mut builder, &fragments, &cfg()).unwrap();
        assert_eq!(outcome.entries[0].title, "Oficio al banco");
    }
}
