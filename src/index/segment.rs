//! Segment metadata, the manifest, and the storage key scheme.
//!
//! A segment is an immutable unit of index data produced by one writer
//! flush. All keys belonging to segment `7` live under the `seg/0000000007/`
//! prefix so a single ordered prefix scan enumerates any of its sections:
//!
//! ```text
//! manifest                                    index manifest (JSON)
//! seg/{id}/meta                               SegmentInfo (JSON)
//! seg/{id}/term/{field}:{term}                TermInfo (JSON)
//! seg/{id}/post/{field}:{term}                postings list (JSON)
//! seg/{id}/doc/{doc_id}                       stored fields (JSON)
//! seg/{id}/frame/{doc_id}/{seq}               frame text (JSON)
//! ```
//!
//! Numeric key components are zero-padded so lexicographic key order equals
//! numeric order.

use serde::{Deserialize, Serialize};

/// Key of the index manifest.
pub const MANIFEST_KEY: &str = "manifest";

/// Dictionary entry for one term in one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermInfo {
    /// Number of documents in the segment containing the term.
    pub doc_freq: u64,
    /// Total number of occurrences of the term across those documents.
    pub total_freq: u64,
}

/// Metadata for one immutable segment, written at flush.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentInfo {
    /// Segment id, unique within the index.
    pub id: u64,
    /// Number of documents in the segment.
    pub doc_count: u64,
    /// Smallest doc id in the segment.
    pub min_doc_id: u64,
    /// Largest doc id in the segment.
    pub max_doc_id: u64,
    /// Number of distinct terms in the segment.
    pub term_count: u64,
    /// CRC32 over the segment's dictionary, postings, stored document and
    /// frame entries, verified when a reader opens the segment.
    pub checksum: u32,
    /// Creation time, seconds since the Unix epoch.
    pub created_at: u64,
}

impl SegmentInfo {
    /// Whether `doc_id` falls inside this segment's id range.
    pub fn contains(&self, doc_id: u64) -> bool {
        self.doc_count > 0 && doc_id >= self.min_doc_id && doc_id <= self.max_doc_id
    }
}

/// The index manifest: the authoritative list of live segments and deleted
/// documents.
///
/// The manifest is rewritten inside the same atomic batch that writes a new
/// segment's data, so a reader either sees a fully published segment or none
/// of it. Deletes are tombstones here; segment data is never rewritten.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Ids of live segments, in creation order.
    pub segments: Vec<u64>,
    /// Doc ids deleted via tombstone, sorted ascending.
    pub tombstones: Vec<u64>,
    /// Next document id to assign. Doc ids are monotonic across the whole
    /// index lifetime, so segment-local to global id mapping is the
    /// identity.
    pub next_doc_id: u64,
    /// Next segment id to assign.
    pub next_segment_id: u64,
}

/// Build the `field:term` full-term key component.
pub fn full_term(field: &str, term: &str) -> String {
    format!("{field}:{term}")
}

/// Key of a segment's metadata record.
pub fn meta_key(segment_id: u64) -> String {
    format!("seg/{segment_id:010}/meta")
}

/// Key of one term's dictionary entry.
pub fn term_key(segment_id: u64, full_term: &str) -> String {
    format!("seg/{segment_id:010}/term/{full_term}")
}

/// Prefix covering a segment's whole term dictionary.
pub fn term_prefix(segment_id: u64) -> String {
    format!("seg/{segment_id:010}/term/")
}

/// Key of one term's postings list.
pub fn postings_key(segment_id: u64, full_term: &str) -> String {
    format!("seg/{segment_id:010}/post/{full_term}")
}

/// Prefix covering a segment's postings section.
pub fn postings_prefix(segment_id: u64) -> String {
    format!("seg/{segment_id:010}/post/")
}

/// Key of a document's stored fields.
pub fn doc_key(segment_id: u64, doc_id: u64) -> String {
    format!("seg/{segment_id:010}/doc/{doc_id:020}")
}

/// Prefix covering a segment's stored documents.
pub fn doc_prefix(segment_id: u64) -> String {
    format!("seg/{segment_id:010}/doc/")
}

/// Key of one frame's text.
pub fn frame_key(segment_id: u64, doc_id: u64, seq: u32) -> String {
    format!("seg/{segment_id:010}/frame/{doc_id:020}/{seq:06}")
}

/// Prefix covering a segment's whole frame section.
pub fn frame_prefix(segment_id: u64) -> String {
    format!("seg/{segment_id:010}/frame/")
}

/// Prefix covering all frames of one document.
pub fn frame_doc_prefix(segment_id: u64, doc_id: u64) -> String {
    format!("seg/{segment_id:010}/frame/{doc_id:020}/")
}
