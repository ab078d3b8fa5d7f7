//! Fragment records and the intake guarantees of the assembly pipeline.
//!
//! A [`Fragment`] is one source PDF contributing pages to the final dossier.
//! Fragments arrive from the external portal navigator already rendered to
//! PDF; this module enforces the boundary guarantee (real PDF payload, no
//! access-denial placeholder) and provides the ordering and deduplication
//! used before merging.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// Placeholder texts the portal serves instead of a real document when a
/// session expires or an attachment is restricted. A payload matching one of
/// these must never reach the merge engine.
const DENIAL_SIGNATURES: &[&str] = &[
    r"(?i)access\s+denied",
    r"(?i)acceso\s+denegado",
    r"(?i)SSL\s+VPN\s+Proxy\s+Error",
    r"(?i)no\s+tiene\s+permisos",
];

fn denial_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DENIAL_SIGNATURES
            .iter()
            .map(|p| Regex::new(p).expect("static pattern"))
            .collect()
    })
}

/// Reason a fragment was rejected at intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentRejection {
    /// The payload does not start with the `%PDF` magic bytes.
    NotAPdf,
    /// The payload contains a known access-denial placeholder text.
    DenialPlaceholder,
    /// The payload is empty.
    Empty,
}

impl std::fmt::Display for FragmentRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FragmentRejection::NotAPdf => write!(f, "payload is not a PDF (missing %PDF magic)"),
            FragmentRejection::DenialPlaceholder => {
                write!(f, "payload is an access-denial placeholder document")
            }
            FragmentRejection::Empty => write!(f, "payload is empty"),
        }
    }
}

/// One source document contributing pages to the assembled dossier.
///
/// Owned exclusively by the caller until handed to the merge engine, which
/// reads it once and discards it (duplicates and blank-only fragments never
/// contribute pages).
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Raw PDF bytes of the source document.
    pub bytes: Vec<u8>,
    /// Generated name of the fragment (filename or portal-derived label).
    pub name: String,
    /// Header text stamped onto every page this fragment contributes.
    /// `None` for operation records; `Some` for attachments.
    pub header_text: Option<String>,
    /// Preferred table-of-contents title. Falls back to `header_text`,
    /// then to `name`.
    pub toc_title: Option<String>,
    /// Chronology key used for ordering; fragments without one keep their
    /// original portal position.
    pub chronology_key: Option<NaiveDate>,
}

impl Fragment {
    /// Create a fragment from raw bytes and a name; all optional metadata
    /// starts unset.
    pub fn new(bytes: Vec<u8>, name: impl Into<String>) -> Self {
        Self {
            bytes,
            name: name.into(),
            header_text: None,
            toc_title: None,
            chronology_key: None,
        }
    }

    /// Builder-style setter for the per-page header text.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header_text = Some(header.into());
        self
    }

    /// Builder-style setter for the table-of-contents title.
    pub fn with_toc_title(mut self, title: impl Into<String>) -> Self {
        self.toc_title = Some(title.into());
        self
    }

    /// Builder-style setter for the chronology key.
    pub fn with_chronology(mut self, date: NaiveDate) -> Self {
        self.chronology_key = Some(date);
        self
    }

    /// Key used for duplicate detection: same name and same byte size means
    /// the same attachment downloaded twice.
    pub fn dedup_key(&self) -> (&str, usize) {
        (&self.name, self.bytes.len())
    }

    /// Title used for this fragment's index entry.
    pub fn display_title(&self) -> &str {
        self.toc_title
            .as_deref()
            .or(self.header_text.as_deref())
            .unwrap_or(&self.name)
    }

    /// Validate the intake guarantees: real PDF payload, no denial
    /// placeholder. Scans only the leading portion of the payload for
    /// placeholder text, which is where the portal puts it.
    pub fn validate(&self) -> Result<(), FragmentRejection> {
        if self.bytes.is_empty() {
            return Err(FragmentRejection::Empty);
        }
        if !self.bytes.starts_with(b"%PDF") {
            return Err(FragmentRejection::NotAPdf);
        }
        let head_len = self.bytes.len().min(16 * 1024);
        let head = String::from_utf8_lossy(&self.bytes[..head_len]);
        if denial_patterns().iter().any(|re| re.is_match(&head)) {
            return Err(FragmentRejection::DenialPlaceholder);
        }
        Ok(())
    }
}

/// Order fragments chronologically where keys exist, keeping the original
/// positional order among fragments without a key (stable sort).
///
/// The first fragment (cover sheet) is pinned: it never moves even if its
/// chronology key would sort it elsewhere.
pub fn order_fragments(mut fragments: Vec<Fragment>) -> Vec<Fragment> {
    if fragments.len() <= 2 {
        return fragments;
    }
    let tail = fragments.split_off(1);
    let mut tail = tail;
    tail.sort_by(|a, b| match (&a.chronology_key, &b.chronology_key) {
        (Some(x), Some(y)) => x.cmp(y),
        _ => std::cmp::Ordering::Equal,
    });
    fragments.extend(tail);
    fragments
}

/// Drop fragments whose `(name, byte size)` key was already seen, keeping the
/// first occurrence.
pub fn dedup_fragments(fragments: Vec<Fragment>) -> Vec<Fragment> {
    let mut seen: std::collections::HashSet<(String, usize)> = std::collections::HashSet::new();
    fragments
        .into_iter()
        .filter(|f| {
            let (name, size) = f.dedup_key();
            seen.insert((name.to_string(), size))
        })
        .collect()
}
