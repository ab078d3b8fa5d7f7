//! Foliation policy and folio arithmetic.
//!
//! A folio ("foja") is a physical leaf number. Court practice numbers one
//! side of each leaf only, so with `stride_two` set, every second physical
//! page receives a number. Structural pages (cover and inserted index pages)
//! are skipped via `skip_leading_pages`, and pages carrying the word
//! "índice" in their text are skipped regardless of position (that check
//! needs page text, so it lives with the stamper, not here).

/// Immutable configuration consumed by the folio numbering stamper.
#[derive(Debug, Clone, PartialEq)]
pub struct FoliationPolicy {
    /// Number of leading pages (cover + index pages) never numbered.
    pub skip_leading_pages: usize,
    /// Number only one side of each leaf (every second physical page).
    pub stride_two: bool,
    /// Value stamped on the first numbered page.
    pub start_value: u32,
    /// Optional fixed text drawn next to the number (e.g. "fs.").
    pub fixed_text: Option<String>,
}

impl Default for FoliationPolicy {
    fn default() -> Self {
        Self {
            skip_leading_pages: 0,
            stride_two: true,
            start_value: 1,
            fixed_text: None,
        }
    }
}

impl FoliationPolicy {
    /// Whether the 0-based physical page should receive a folio number,
    /// considering only page position (text-based skips are the stamper's
    /// concern).
    pub fn is_eligible(&self, page: usize) -> bool {
        if page < self.skip_leading_pages {
            return false;
        }
        if self.stride_two {
            (page - self.skip_leading_pages) % 2 == 0
        } else {
            true
        }
    }

    /// Folio value for the 0-based physical page, or `None` if the page is
    /// not eligible.
    pub fn folio_value(&self, page: usize) -> Option<u32> {
        if !self.is_eligible(page) {
            return None;
        }
        let offset = page - self.skip_leading_pages;
        let steps = if self.stride_two { offset / 2 } else { offset };
        Some(self.start_value + steps as u32)
    }

    /// Leaf number covering the 0-based page, whichever side of the leaf it
    /// falls on. This is the number printed next to an index entry whose
    /// target is `page`.
    pub fn leaf_value(&self, page: usize) -> Option<u32> {
        if page < self.skip_leading_pages {
            return None;
        }
        let offset = page - self.skip_leading_pages;
        let steps = if self.stride_two { offset / 2 } else { offset };
        Some(self.start_value + steps as u32)
    }
}
