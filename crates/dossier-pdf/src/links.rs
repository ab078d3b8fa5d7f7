//! Link repair pass.
//!
//! Later passes re-save the document and may drop the index page's link
//! annotations. This pass rebuilds them from the [`LinkMap`] recorded at
//! index construction time: it strips whatever link annotations remain on
//! each source page and re-inserts exactly one GOTO link per map entry.
//! Running it twice yields the same link set.

use std::collections::BTreeSet;

use dossier_core::LinkMap;
use tracing::{info, warn};

use crate::document::DocumentBuilder;
use crate::error::StageError;
use crate::toc::{LEFT_MARGIN, LINK_BAND_ABOVE, LINK_BAND_BELOW, RIGHT_MARGIN};

/// Re-apply the link map, returning the number of links inserted.
///
/// The map's page numbers are 1-based; they stay valid because every pass
/// after index construction preserves the page count. Entries pointing at
/// pages that no longer exist are logged and skipped.
pub fn repair_links(builder: &mut DocumentBuilder, map: &LinkMap) -> Result<usize, StageError> {
    if map.is_empty() {
        return Ok(0);
    }

    // Page numbers are 1-based; a zero means a malformed sidecar entry.
    let sources: BTreeSet<usize> = map
        .items
        .iter()
        .map(|e| e.source_page)
        .filter(|&p| p > 0)
        .collect();
    for &source in &sources {
        match builder.remove_link_annotations(source - 1) {
            Ok(removed) if removed > 0 => {
                info!(page = source, removed, "cleared stale links")
            }
            Ok(_) => {}
            Err(e) => warn!(page = source, error = %e, "could not clear stale links"),
        }
    }

    let mut inserted = 0;
    for entry in &map.items {
        if entry.source_page == 0 || entry.target_page == 0 {
            warn!(title = %entry.title, "malformed map entry, skipped");
            continue;
        }
        let source = entry.source_page - 1;
        let target = entry.target_page - 1;
        let (width, _) = builder.media_box(source);
        let rect = [
            LEFT_MARGIN,
            entry.y_offset - LINK_BAND_BELOW,
            width - RIGHT_MARGIN,
            entry.y_offset + LINK_BAND_ABOVE,
        ];
        match builder.add_goto_link(source, rect, target) {
            Ok(()) => inserted += 1,
            Err(e) => warn!(title = %entry.title, error = %e, "link not restored"),
        }
    }
    info!(inserted, "link repair complete");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::pdf_with_pages;
    use crate::toc::build_index;
    use dossier_core::IndexEntry;

    fn indexed_doc() -> (DocumentBuilder, LinkMap) {
        let mut builder = DocumentBuilder::new();
        builder.append_pdf_bytes(&pdf_with_pages(5)).unwrap();
        let entries = vec![
            IndexEntry::new("Primera actuación", 1),
            IndexEntry::new("Segunda actuación", 3),
        ];
        let map = build_index(&mut builder, &entries);
        (builder, map)
    }

    #[test]
    fn repair_restores_links_after_removal() {
        let (mut builder, map) = indexed_doc();
        builder.remove_link_annotations(1).unwrap();
        assert!(builder.link_annotations(1).is_empty());
        let inserted = repair_links(&mut builder, &map).unwrap();
        assert_eq!(inserted, 2);
        let links = builder.link_annotations(1);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].1, Some(map.items[0].target_page - 1));
    }

    #[test]
    fn repair_is_idempotent() {
        let (mut builder, map) = indexed_doc();
        repair_links(&mut builder, &map).unwrap();
        let first = builder.link_annotations(1);
        repair_links(&mut builder, &map).unwrap();
        let second = builder.link_annotations(1);
        assert_eq!(first, second);
    }

    #[test]
    fn repair_survives_a_save_round_trip() {
        let (mut builder, map) = indexed_doc();
        let bytes = builder.to_bytes().unwrap();
        let mut reloaded = DocumentBuilder::from_bytes(&bytes).unwrap();
        let inserted = repair_links(&mut reloaded, &map).unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(reloaded.link_annotations(1).len(), 2);
    }

    #[test]
    fn out_of_range_entry_is_skipped() {
        let (mut builder, mut map) = indexed_doc();
        map.items[1].target_page = 99;
        let inserted = repair_links(&mut builder, &map).unwrap();
        assert_eq!(inserted, 1);
    }

    #[test]
    fn zero_page_entry_is_skipped() {
        let (mut builder, mut map) = indexed_doc();
        // A hand-edited sidecar can carry 0 where 1-based pages belong.
        map.items.push(dossier_core::LinkMapEntry {
            title: "entrada rota".to_string(),
            source_page: 0,
            target_page: 0,
            y_offset: 0.0,
        });
        let inserted = repair_links(&mut builder, &map).unwrap();
        assert_eq!(inserted, 2);
    }

    #[test]
    fn empty_map_is_a_no_op() {
        let (mut builder, _) = indexed_doc();
        assert_eq!(repair_links(&mut builder, &LinkMap::default()).unwrap(), 0);
    }
}
