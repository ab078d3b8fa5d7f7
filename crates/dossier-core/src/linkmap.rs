//! Serializable record of index-page link geometry.
//!
//! The map is produced by the ToC builder, persisted as a sidecar next to the
//! output document, and consumed by the link repair pass after later passes
//! (OCR, foliation) may have destroyed the original annotations. Page
//! numbers in the map are valid as long as the document's page count is
//! unchanged, which every later pass guarantees.

use serde::{Deserialize, Serialize};

/// Geometry and target of a single clickable index line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkMapEntry {
    /// Entry title as drawn on the index page.
    pub title: String,
    /// Index page holding the link, 1-based.
    pub source_page: usize,
    /// Page the link jumps to, 1-based, in the final document.
    pub target_page: usize,
    /// Baseline y of the drawn line on the source page, in PDF points from
    /// the bottom edge. The clickable rectangle is rebuilt from this offset
    /// and the configured line height.
    pub y_offset: f64,
}

/// The complete link map for one assembled document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkMap {
    /// One entry per index line, in drawing order.
    pub items: Vec<LinkMapEntry>,
    /// Number of index pages that were inserted after the cover page.
    pub idx_pages: usize,
}

impl LinkMap {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
