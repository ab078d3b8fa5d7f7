//! dossier-core: Backend-independent data types and algorithms for dossier-rs.
//!
//! This crate provides the value types that travel through the assembly
//! pipeline (fragments, index entries, link maps, foliation policies,
//! configuration) together with the pure algorithms that operate on them
//! (ordering, deduplication, title truncation, folio arithmetic, text
//! classification). It knows nothing about any concrete PDF backend.

mod config;
mod fragment;
mod geometry;
mod index;
mod linkmap;
mod text;

pub mod foliation;

pub use config::{OcrMode, PipelineConfig};
pub use foliation::FoliationPolicy;
pub use fragment::{Fragment, FragmentRejection, dedup_fragments, order_fragments};
pub use geometry::BBox;
pub use index::{IndexEntry, MAX_TITLE_CHARS, truncate_title};
pub use linkmap::{LinkMap, LinkMapEntry};
pub use text::{PositionedSpan, body_char_count, fold_diacritics, is_index_page_text};
