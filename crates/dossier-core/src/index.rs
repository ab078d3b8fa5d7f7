//! Index entries produced while merging, consumed by the ToC builder.

/// Maximum title length drawn on an index line.
pub const MAX_TITLE_CHARS: usize = 120;

/// One table-of-contents entry: a title and the page where the fragment it
/// describes begins. Created by the merge engine, immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Entry title, truncated to [`MAX_TITLE_CHARS`].
    pub title: String,
    /// First page of the fragment in the merged document, 0-based, counted
    /// before any index pages are inserted.
    pub start_page: usize,
}

impl IndexEntry {
    pub fn new(title: &str, start_page: usize) -> Self {
        Self {
            title: truncate_title(title, MAX_TITLE_CHARS),
            start_page,
        }
    }
}

/// Truncate a title to `max` characters, respecting char boundaries.
pub fn truncate_title(title: &str, max: usize) -> String {
    if title.chars().count() <= max {
        return title.to_string();
    }
    title.chars().take(max).collect()
}
