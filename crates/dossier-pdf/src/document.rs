//! Owned, single-threaded document builder.
//!
//! [`DocumentBuilder`] wraps a [`lopdf::Document`] together with an
//! authoritative ordered page list. Every pipeline stage receives the
//! builder by exclusive reference and mutates it in place; nothing is ever
//! shared across threads. Fragment documents are imported by renumbering
//! their objects past the builder's current id space and adopting everything
//! except their page-tree scaffolding, which is rebuilt from the page list
//! before serialization.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::debug;

use crate::error::StageError;
use crate::fonts::Face;

/// Page attributes inherited through the page tree that must be copied onto
/// each page dictionary before its parent chain is severed by the import.
const INHERITED_KEYS: &[&[u8]] = &[b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// The in-progress assembled document.
pub struct DocumentBuilder {
    doc: Document,
    pages: Vec<ObjectId>,
    pages_root: ObjectId,
    catalog_id: ObjectId,
    /// One shared font object per face.
    fonts: HashMap<&'static str, ObjectId>,
    /// Pages whose original content has been wrapped in q/Q so overlay
    /// streams start from a clean graphics state.
    isolated: HashSet<ObjectId>,
}

impl DocumentBuilder {
    /// Create an empty document.
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_root = doc.new_object_id();
        doc.objects.insert(
            pages_root,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Object::Array(Vec::new()),
                "Count" => 0,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_root),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        Self {
            doc,
            pages: Vec::new(),
            pages_root,
            catalog_id,
            fonts: HashMap::new(),
            isolated: HashSet::new(),
        }
    }

    /// Open an existing document for a standalone pass (OCR, foliation, link
    /// repair on an already-assembled file).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StageError> {
        let mut builder = Self::new();
        builder.append_pdf_bytes(bytes)?;
        Ok(builder)
    }

    /// Number of pages currently in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub(crate) fn doc(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn page_id(&self, index: usize) -> Option<ObjectId> {
        self.pages.get(index).copied()
    }

    /// Append every page of a source PDF, returning the 0-based indices the
    /// new pages occupy.
    pub fn append_pdf_bytes(&mut self, bytes: &[u8]) -> Result<Vec<usize>, StageError> {
        let mut src = Document::load_mem(bytes)?;
        src.decompress();

        let src_pages: Vec<ObjectId> = src.get_pages().values().copied().collect();
        if src_pages.is_empty() {
            return Ok(Vec::new());
        }
        for &page_id in &src_pages {
            materialize_inherited(&mut src, page_id)?;
        }

        src.renumber_objects_with(self.doc.max_id + 1);
        let renumbered_pages: Vec<ObjectId> = src.get_pages().values().copied().collect();
        self.doc.max_id = src.max_id;

        for (id, object) in src.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Outlines" | b"Outline" => {}
                _ => {
                    self.doc.objects.insert(id, object);
                }
            }
        }

        let first = self.pages.len();
        self.pages.extend(renumbered_pages.iter().copied());
        debug!(pages = renumbered_pages.len(), "appended fragment pages");
        Ok((first..self.pages.len()).collect())
    }

    /// Insert `count` blank pages of the given size immediately after the
    /// page at `after`, returning the indices of the new pages.
    pub fn insert_blank_pages_after(
        &mut self,
        after: usize,
        count: usize,
        width: f64,
        height: f64,
    ) -> Result<Vec<usize>, StageError> {
        if after >= self.pages.len() {
            return Err(StageError::Pdf(format!(
                "insert position {after} beyond page count {}",
                self.pages.len()
            )));
        }
        let mut new_ids = Vec::with_capacity(count);
        for _ in 0..count {
            let content_id = self.doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = self.doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(self.pages_root),
                "MediaBox" => vec![real(0.0), real(0.0), real(width), real(height)],
                "Resources" => dictionary! {},
                "Contents" => Object::Reference(content_id),
            });
            new_ids.push(page_id);
        }
        let at = after + 1;
        for (offset, id) in new_ids.iter().enumerate() {
            self.pages.insert(at + offset, *id);
        }
        Ok((at..at + count).collect())
    }

    /// Remove the pages at the given 0-based indices.
    pub fn remove_pages(&mut self, indices: &[usize]) {
        let doomed: HashSet<usize> = indices.iter().copied().collect();
        let mut kept = Vec::with_capacity(self.pages.len());
        for (i, id) in self.pages.iter().enumerate() {
            if !doomed.contains(&i) {
                kept.push(*id);
            }
        }
        self.pages = kept;
    }

    /// Media box of the page at `index` as `(width, height)`. Falls back to
    /// US Letter when the page carries no usable media box.
    pub fn media_box(&self, index: usize) -> (f64, f64) {
        let Some(page_id) = self.page_id(index) else {
            return (612.0, 792.0);
        };
        let Ok(dict) = self.doc.get_dictionary(page_id) else {
            return (612.0, 792.0);
        };
        let resolved;
        let media = match dict.get(b"MediaBox") {
            Ok(Object::Reference(r)) => {
                resolved = self.doc.get_object(*r).ok();
                resolved.as_ref().copied()
            }
            Ok(obj) => Some(obj),
            Err(_) => None,
        };
        if let Some(Object::Array(values)) = media
            && values.len() == 4
        {
            let nums: Vec<f64> = values.iter().map(object_to_f64).collect();
            let w = nums[2] - nums[0];
            let h = nums[3] - nums[1];
            if w > 1.0 && h > 1.0 {
                return (w, h);
            }
        }
        (612.0, 792.0)
    }

    /// Decoded content stream bytes of the page at `index`.
    pub(crate) fn page_content(&self, index: usize) -> Result<Vec<u8>, StageError> {
        let page_id = self
            .page_id(index)
            .ok_or_else(|| StageError::Pdf(format!("no page at index {index}")))?;
        Ok(self.doc.get_page_content(page_id)?)
    }

    /// Append overlay operations to the page at `index`.
    ///
    /// The first overlay on a page first brackets the original content in
    /// q/Q so inherited graphics state cannot leak into the overlay.
    pub fn append_content(&mut self, index: usize, ops: Vec<Operation>) -> Result<(), StageError> {
        let overlay = self.intern_content(ops)?;
        self.append_content_ref(index, overlay)
    }

    /// Encode overlay operations into a content stream object once, for
    /// sharing across pages via [`Self::append_content_ref`].
    pub(crate) fn intern_content(&mut self, ops: Vec<Operation>) -> Result<ObjectId, StageError> {
        let encoded = Content { operations: ops }
            .encode()
            .map_err(|e| StageError::Pdf(format!("content encode: {e}")))?;
        Ok(self.doc.add_object(Stream::new(dictionary! {}, encoded)))
    }

    /// Append an already-interned overlay stream to the page at `index`.
    pub(crate) fn append_content_ref(
        &mut self,
        index: usize,
        overlay: ObjectId,
    ) -> Result<(), StageError> {
        let page_id = self
            .page_id(index)
            .ok_or_else(|| StageError::Pdf(format!("no page at index {index}")))?;

        let mut refs = self.contents_refs(page_id)?;
        if !self.isolated.contains(&page_id) && !refs.is_empty() {
            let save = self
                .doc
                .add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
            let restore = self
                .doc
                .add_object(Stream::new(dictionary! {}, b"Q\n".to_vec()));
            refs.insert(0, Object::Reference(save));
            refs.push(Object::Reference(restore));
            self.isolated.insert(page_id);
        }
        refs.push(Object::Reference(overlay));

        let dict = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)?;
        dict.set("Contents", Object::Array(refs));
        Ok(())
    }

    /// Normalize the page's /Contents entry to a flat list of stream
    /// references.
    fn contents_refs(&mut self, page_id: ObjectId) -> Result<Vec<Object>, StageError> {
        let dict = self.doc.get_dictionary(page_id)?;
        match dict.get(b"Contents") {
            Err(_) => Ok(Vec::new()),
            Ok(Object::Array(items)) => Ok(items.clone()),
            Ok(Object::Reference(r)) => match self.doc.get_object(*r) {
                Ok(Object::Array(items)) => Ok(items.clone()),
                _ => Ok(vec![Object::Reference(*r)]),
            },
            Ok(Object::Stream(stream)) => {
                let stream = stream.clone();
                let id = self.doc.add_object(stream);
                Ok(vec![Object::Reference(id)])
            }
            Ok(other) => Err(StageError::Pdf(format!(
                "unexpected /Contents object: {other:?}"
            ))),
        }
    }

    /// Ensure the page's resources expose the given standard font, returning
    /// the resource name to use in `Tf`.
    pub fn ensure_font(&mut self, index: usize, face: Face) -> Result<&'static str, StageError> {
        let page_id = self
            .page_id(index)
            .ok_or_else(|| StageError::Pdf(format!("no page at index {index}")))?;
        let res_name = match face {
            Face::Helvetica => "FDos",
            Face::HelveticaBold => "FDosB",
        };
        let base = face.base_font();
        let font_id = match self.fonts.get(base) {
            Some(id) => *id,
            None => {
                let id = self.doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => base,
                    "Encoding" => "WinAnsiEncoding",
                });
                self.fonts.insert(base, id);
                id
            }
        };

        // Resources and its /Font dictionary may be indirect or shared with
        // other imported pages; clone them onto this page before mutating.
        let resources = match self.doc.get_dictionary(page_id)?.get(b"Resources") {
            Ok(Object::Dictionary(d)) => d.clone(),
            Ok(Object::Reference(r)) => match self.doc.get_object(*r) {
                Ok(Object::Dictionary(d)) => d.clone(),
                _ => Dictionary::new(),
            },
            _ => Dictionary::new(),
        };
        let mut resources = resources;
        let mut font_dict = match resources.get(b"Font") {
            Ok(Object::Dictionary(d)) => d.clone(),
            Ok(Object::Reference(r)) => match self.doc.get_object(*r) {
                Ok(Object::Dictionary(d)) => d.clone(),
                _ => Dictionary::new(),
            },
            _ => Dictionary::new(),
        };
        font_dict.set(res_name, Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(font_dict));

        let dict = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)?;
        dict.set("Resources", Object::Dictionary(resources));
        Ok(res_name)
    }

    /// Insert a GOTO link annotation on `source` jumping to `target`.
    /// `rect` is `[x0, y0, x1, y1]` in page points, bottom-left origin.
    pub fn add_goto_link(
        &mut self,
        source: usize,
        rect: [f64; 4],
        target: usize,
    ) -> Result<(), StageError> {
        if self.page_id(source).is_none() {
            return Err(StageError::Link(format!("no source page at index {source}")));
        }
        let target_id = self
            .page_id(target)
            .ok_or_else(|| StageError::Link(format!("no target page at index {target}")))?;

        self.push_annotation(
            source,
            dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => vec![real(rect[0]), real(rect[1]), real(rect[2]), real(rect[3])],
                "Border" => vec![0.into(), 0.into(), 0.into()],
                "A" => dictionary! {
                    "S" => "GoTo",
                    "D" => vec![
                        Object::Reference(target_id),
                        Object::Name(b"XYZ".to_vec()),
                        Object::Null,
                        Object::Null,
                        Object::Null,
                    ],
                },
            },
        )
    }

    /// Append an annotation dictionary to the page at `index`.
    pub(crate) fn push_annotation(
        &mut self,
        index: usize,
        annot: Dictionary,
    ) -> Result<(), StageError> {
        let page_id = self
            .page_id(index)
            .ok_or_else(|| StageError::Pdf(format!("no page at index {index}")))?;
        let annot_id = self.doc.add_object(annot);
        let mut annots = self.annots_refs(page_id)?;
        annots.push(Object::Reference(annot_id));
        let dict = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)?;
        dict.set("Annots", Object::Array(annots));
        Ok(())
    }

    /// Remove every Link annotation from the page at `index`.
    pub fn remove_link_annotations(&mut self, index: usize) -> Result<usize, StageError> {
        let page_id = self
            .page_id(index)
            .ok_or_else(|| StageError::Pdf(format!("no page at index {index}")))?;
        let annots = self.annots_refs(page_id)?;
        let before = annots.len();
        let kept: Vec<Object> = annots
            .into_iter()
            .filter(|a| !self.is_link_annotation(a))
            .collect();
        let removed = before - kept.len();
        let dict = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)?;
        if kept.is_empty() {
            dict.remove(b"Annots");
        } else {
            dict.set("Annots", Object::Array(kept));
        }
        Ok(removed)
    }

    /// Collect the Link annotations of a page as `(rect, target page index)`
    /// pairs, for verification and tests.
    pub fn link_annotations(&self, index: usize) -> Vec<([f64; 4], Option<usize>)> {
        let Some(page_id) = self.page_id(index) else {
            return Vec::new();
        };
        let Ok(annots) = self.annots_list(page_id) else {
            return Vec::new();
        };
        let mut links = Vec::new();
        for annot in annots {
            let Some(dict) = self.resolve_dict(&annot) else {
                continue;
            };
            if dict
                .get(b"Subtype")
                .ok()
                .and_then(|o| o.as_name().ok())
                != Some(b"Link".as_slice())
            {
                continue;
            }
            let Ok(Object::Array(rect)) = dict.get(b"Rect") else {
                continue;
            };
            if rect.len() != 4 {
                continue;
            }
            let r = [
                object_to_f64(&rect[0]),
                object_to_f64(&rect[1]),
                object_to_f64(&rect[2]),
                object_to_f64(&rect[3]),
            ];
            let target = self.link_target(&dict);
            links.push((r, target));
        }
        links
    }

    fn link_target(&self, dict: &Dictionary) -> Option<usize> {
        let action = match dict.get(b"A").ok()? {
            Object::Dictionary(d) => d.clone(),
            Object::Reference(r) => self.doc.get_dictionary(*r).ok()?.clone(),
            _ => return None,
        };
        let dest = match action.get(b"D").ok()? {
            Object::Array(items) => items.clone(),
            _ => return None,
        };
        let Object::Reference(page_ref) = dest.first()? else {
            return None;
        };
        self.pages.iter().position(|id| id == page_ref)
    }

    fn annots_refs(&mut self, page_id: ObjectId) -> Result<Vec<Object>, StageError> {
        self.annots_list(page_id)
    }

    fn annots_list(&self, page_id: ObjectId) -> Result<Vec<Object>, StageError> {
        let dict = self.doc.get_dictionary(page_id)?;
        match dict.get(b"Annots") {
            Err(_) => Ok(Vec::new()),
            Ok(Object::Array(items)) => Ok(items.clone()),
            Ok(Object::Reference(r)) => match self.doc.get_object(*r) {
                Ok(Object::Array(items)) => Ok(items.clone()),
                _ => Ok(Vec::new()),
            },
            Ok(_) => Ok(Vec::new()),
        }
    }

    fn is_link_annotation(&self, annot: &Object) -> bool {
        self.resolve_dict(annot)
            .map(|d| {
                d.get(b"Subtype")
                    .ok()
                    .and_then(|o| o.as_name().ok())
                    == Some(b"Link".as_slice())
            })
            .unwrap_or(false)
    }

    fn resolve_dict(&self, obj: &Object) -> Option<Dictionary> {
        match obj {
            Object::Dictionary(d) => Some(d.clone()),
            Object::Reference(r) => self.doc.get_dictionary(*r).ok().cloned(),
            _ => None,
        }
    }

    /// Rewrite the page tree and catalog from the current page list.
    fn rebuild_tree(&mut self) {
        let kids: Vec<Object> = self
            .pages
            .iter()
            .map(|&id| Object::Reference(id))
            .collect();
        for &page_id in &self.pages {
            if let Ok(dict) = self
                .doc
                .get_object_mut(page_id)
                .and_then(Object::as_dict_mut)
            {
                dict.set("Parent", Object::Reference(self.pages_root));
            }
        }
        self.doc.objects.insert(
            self.pages_root,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Object::Array(kids),
                "Count" => self.pages.len() as i64,
            }),
        );
        self.doc.objects.insert(
            self.catalog_id,
            Object::Dictionary(dictionary! {
                "Type" => "Catalog",
                "Pages" => Object::Reference(self.pages_root),
            }),
        );
        self.doc
            .trailer
            .set("Root", Object::Reference(self.catalog_id));
    }

    /// Serialize the document to bytes.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, StageError> {
        self.rebuild_tree();
        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| StageError::Pdf(format!("save: {e}")))?;
        Ok(buf)
    }

    /// Write the document to `path`, returning the written size.
    pub fn save_file(&mut self, path: &Path) -> Result<u64, StageError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, &bytes)?;
        Ok(bytes.len() as u64)
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy inherited page-tree attributes onto the page dictionary itself.
fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), StageError> {
    for &key in INHERITED_KEYS {
        let present = doc
            .get_dictionary(page_id)
            .map(|d| d.has(key))
            .unwrap_or(false);
        if present {
            continue;
        }
        if let Some(value) = inherited_value(doc, page_id, key) {
            if let Ok(dict) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
                dict.set(key, value);
            }
        }
    }
    Ok(())
}

/// Walk the parent chain looking for an inherited attribute value.
fn inherited_value(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    // Guard against malformed self-referential parent chains.
    for _ in 0..64 {
        let dict = doc.get_dictionary(current).ok()?;
        if current != page_id
            && let Ok(value) = dict.get(key)
        {
            let value = match value {
                Object::Reference(r) => doc.get_object(*r).ok()?.clone(),
                other => other.clone(),
            };
            return Some(value);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

/// Build a numeric PDF object from an f64 (lopdf reals are f32).
pub(crate) fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

pub(crate) fn object_to_f64(obj: &Object) -> f64 {
    match obj {
        Object::Integer(i) => *i as f64,
        Object::Real(r) => f64::from(*r),
        _ => 0.0,
    }
}
