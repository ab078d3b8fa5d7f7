//! Table-of-contents construction.
//!
//! Index pages are inserted immediately after the cover page. Each entry
//! line carries the fragment title, a dotted leader, the foja number its
//! target lands on, and a GOTO link annotation spanning the line. The
//! geometry of every link is also recorded in a [`LinkMap`] so the link
//! repair pass can rebuild the annotations after later passes.
//!
//! ToC construction must never sink the run: when layout or page insertion
//! fails the document falls back to a flat, unindexed merge.

use dossier_core::{FoliationPolicy, IndexEntry, LinkMap, LinkMapEntry};
use tracing::{info, warn};

use crate::document::DocumentBuilder;
use crate::error::StageError;
use crate::fonts::Face;
use crate::overlay::{RenderMode, leader_dots, right_aligned_text_ops, text_ops};

/// Left and right text margins of an index page, points.
pub const LEFT_MARGIN: f64 = 56.0;
pub const RIGHT_MARGIN: f64 = 56.0;
/// Baseline-to-baseline distance between index lines.
pub const LINE_HEIGHT: f64 = 16.0;
/// Height of the clickable band around a line's baseline: 3 points below,
/// 13 above.
pub const LINK_BAND_BELOW: f64 = 3.0;
pub const LINK_BAND_ABOVE: f64 = 13.0;

const TITLE_SIZE: f64 = 14.0;
const ENTRY_SIZE: f64 = 11.0;
/// Baseline of the "ÍNDICE" heading, measured down from the top edge.
const HEADING_DROP: f64 = 64.0;
/// Baseline of the first entry line, measured down from the top edge.
const ENTRIES_DROP: f64 = 96.0;
/// Lowest baseline allowed before wrapping to the next index page (bottom
/// margin plus a footer reserve).
const BOTTOM_LIMIT: f64 = LEFT_MARGIN + 24.0;
/// Gap between the leader and the foja number.
const NUMBER_GAP: f64 = 6.0;

/// Build the index pages and return the link map.
///
/// Entries are laid out in ascending start-page order; targets shift by the
/// number of inserted index pages. With no entries, or when index pages
/// cannot be created, the document is left as a flat merge and the returned
/// map is empty.
pub fn build_index(builder: &mut DocumentBuilder, entries: &[IndexEntry]) -> LinkMap {
    if entries.is_empty() {
        return LinkMap::default();
    }
    let mut ordered: Vec<IndexEntry> = entries.to_vec();
    ordered.sort_by_key(|e| e.start_page);

    let (width, height) = builder.media_box(0);
    let idx_pages = simulate_page_count(ordered.len(), height);

    match draw_index(builder, &ordered, width, height, idx_pages) {
        Ok(map) => {
            info!(entries = map.items.len(), idx_pages, "index built");
            map
        }
        Err(e) => {
            warn!(error = %e, "index construction failed, falling back to flat merge");
            LinkMap::default()
        }
    }
}

/// Walk the layout without drawing to count the index pages needed.
fn simulate_page_count(entry_count: usize, page_height: f64) -> usize {
    let mut pages = 1;
    let mut y = page_height - ENTRIES_DROP;
    for _ in 0..entry_count {
        if y < BOTTOM_LIMIT {
            pages += 1;
            y = page_height - ENTRIES_DROP;
        }
        y -= LINE_HEIGHT;
    }
    pages
}

fn draw_index(
    builder: &mut DocumentBuilder,
    entries: &[IndexEntry],
    width: f64,
    height: f64,
    idx_pages: usize,
) -> Result<LinkMap, StageError> {
    let inserted = builder.insert_blank_pages_after(0, idx_pages, width, height)?;

    // Foja arithmetic: cover plus the index pages are structural and carry
    // no number; the first content page is foja 1.
    let policy = FoliationPolicy {
        skip_leading_pages: 1 + idx_pages,
        ..FoliationPolicy::default()
    };

    let heading_res = builder.ensure_font(inserted[0], Face::HelveticaBold)?;
    let heading = "ÍNDICE";
    let heading_x = (width - Face::HelveticaBold.text_width(heading, TITLE_SIZE)) / 2.0;
    builder.append_content(
        inserted[0],
        text_ops(
            heading_res,
            TITLE_SIZE,
            heading_x,
            height - HEADING_DROP,
            heading,
            RenderMode::Fill,
        ),
    )?;

    let mut map = LinkMap {
        items: Vec::with_capacity(entries.len()),
        idx_pages,
    };
    let mut page_cursor = 0usize;
    let mut y = height - ENTRIES_DROP;

    for entry in entries {
        if y < BOTTOM_LIMIT {
            page_cursor += 1;
            y = height - ENTRIES_DROP;
        }
        // Running past the simulated count would clobber content pages.
        if page_cursor >= idx_pages {
            warn!(title = %entry.title, "index overflow, entry dropped");
            continue;
        }
        let index_page = inserted[page_cursor];
        let target = entry.start_page + idx_pages;
        let label = match policy.leaf_value(target) {
            Some(n) => n.to_string(),
            None => (target + 1).to_string(),
        };

        if let Err(e) = draw_entry(builder, index_page, width, y, &entry.title, &label) {
            warn!(title = %entry.title, error = %e, "index line not drawn");
        }
        let rect = [
            LEFT_MARGIN,
            y - LINK_BAND_BELOW,
            width - RIGHT_MARGIN,
            y + LINK_BAND_ABOVE,
        ];
        if let Err(e) = builder.add_goto_link(index_page, rect, target) {
            warn!(title = %entry.title, error = %e, "index link not inserted");
        }
        map.items.push(LinkMapEntry {
            title: entry.title.clone(),
            source_page: index_page + 1,
            target_page: target + 1,
            y_offset: y,
        });
        y -= LINE_HEIGHT;
    }
    Ok(map)
}

/// Draw one index line: title, dotted leader, right-aligned foja number.
fn draw_entry(
    builder: &mut DocumentBuilder,
    page: usize,
    width: f64,
    y: f64,
    title: &str,
    label: &str,
) -> Result<(), StageError> {
    let font_res = builder.ensure_font(page, Face::Helvetica)?;
    let right_x = width - RIGHT_MARGIN;
    let number_width = Face::Helvetica.text_width(label, ENTRY_SIZE);

    // Clip the title so at least the number always fits on the line.
    let max_title_width = right_x - LEFT_MARGIN - number_width - NUMBER_GAP;
    let mut title: String = title.to_string();
    while !title.is_empty() && Face::Helvetica.text_width(&title, ENTRY_SIZE) > max_title_width {
        title.pop();
    }
    let title_width = Face::Helvetica.text_width(&title, ENTRY_SIZE);

    let mut ops = text_ops(font_res, ENTRY_SIZE, LEFT_MARGIN, y, &title, RenderMode::Fill);
    let gap = right_x - number_width - NUMBER_GAP - (LEFT_MARGIN + title_width + 4.0);
    if let Some(dots) = leader_dots(Face::Helvetica, ENTRY_SIZE, gap) {
        ops.extend(text_ops(
            font_res,
            ENTRY_SIZE,
            LEFT_MARGIN + title_width + 4.0,
            y,
            &dots,
            RenderMode::Fill,
        ));
    }
    ops.extend(right_aligned_text_ops(
        font_res,
        Face::Helvetica,
        ENTRY_SIZE,
        right_x,
        y,
        label,
        RenderMode::Fill,
    ));
    builder.append_content(page, ops)
}
