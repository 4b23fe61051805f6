//! Index reader: pinned manifest snapshot, segment merge, stored data
//! lookup.

use std::collections::BTreeSet;
use std::sync::Arc;

use ahash::AHashSet;
use crc32fast::Hasher;

use crate::document::Document;
use crate::error::{ChrysalisError, Result};
use crate::index::postings::{MergedPostings, Posting, PostingsList};
use crate::index::segment::{self, Manifest, SegmentInfo, TermInfo, MANIFEST_KEY};
use crate::storage::StorageRef;

/// Postings merged across segments with tombstoned documents filtered out.
pub struct PostingsIter {
    inner: MergedPostings,
    tombstones: Arc<AHashSet<u64>>,
}

impl Iterator for PostingsIter {
    type Item = Posting;

    fn next(&mut self) -> Option<Posting> {
        loop {
            let posting = self.inner.next()?;
            if !self.tombstones.contains(&posting.doc_id) {
                return Some(posting);
            }
        }
    }
}

/// A point-in-time view of the index.
///
/// `open` reads the manifest once and pins that segment set and tombstone
/// set; writers flushing afterwards do not affect this reader. Segments are
/// immutable, so the read path takes no locks.
#[derive(Debug)]
pub struct IndexReader {
    storage: StorageRef,
    manifest: Manifest,
    segments: Vec<SegmentInfo>,
    tombstones: Arc<AHashSet<u64>>,
}

impl IndexReader {
    /// Open a reader over the current manifest.
    ///
    /// Every listed segment is opened and its CRC32 checksum verified
    /// against the dictionary, postings, stored document and frame bytes;
    /// a mismatch fails closed
    /// with [`ChrysalisError::CorruptSegment`] rather than serving damaged
    /// postings.
    pub fn open(storage: StorageRef) -> Result<Self> {
        let manifest: Manifest = match storage.get(MANIFEST_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => Manifest::default(),
        };

        let mut segments = Vec::with_capacity(manifest.segments.len());
        for &id in &manifest.segments {
            let info = Self::open_segment(&storage, id)?;
            segments.push(info);
        }

        let tombstones: AHashSet<u64> = manifest.tombstones.iter().copied().collect();
        log::debug!(
            "reader opened: {} segments, {} tombstones",
            segments.len(),
            tombstones.len()
        );
        Ok(IndexReader {
            storage,
            manifest,
            segments,
            tombstones: Arc::new(tombstones),
        })
    }

    fn open_segment(storage: &StorageRef, id: u64) -> Result<SegmentInfo> {
        let meta = storage.get(&segment::meta_key(id))?.ok_or_else(|| {
            ChrysalisError::corrupt(format!("segment {id} listed in manifest but has no metadata"))
        })?;
        let info: SegmentInfo = serde_json::from_slice(&meta)?;

        // Recompute the flush-time hash over the same key/value sequence:
        // per term, dictionary entry then postings, in sorted term order,
        // then the stored docs and frame texts in sorted key order.
        let terms = storage.range_prefix(&segment::term_prefix(id))?;
        let posts = storage.range_prefix(&segment::postings_prefix(id))?;
        if terms.len() != posts.len() {
            return Err(ChrysalisError::corrupt(format!(
                "segment {id}: {} dictionary entries but {} postings lists",
                terms.len(),
                posts.len()
            )));
        }
        let mut hasher = Hasher::new();
        for ((term_key, term_value), (post_key, post_value)) in terms.iter().zip(posts.iter()) {
            hasher.update(term_key.as_bytes());
            hasher.update(term_value);
            hasher.update(post_key.as_bytes());
            hasher.update(post_value);
        }
        for (key, value) in storage.range_prefix(&segment::doc_prefix(id))? {
            hasher.update(key.as_bytes());
            hasher.update(&value);
        }
        for (key, value) in storage.range_prefix(&segment::frame_prefix(id))? {
            hasher.update(key.as_bytes());
            hasher.update(&value);
        }
        let computed = hasher.finalize();
        if computed != info.checksum {
            return Err(ChrysalisError::corrupt(format!(
                "segment {id}: checksum mismatch (stored {:#010x}, computed {computed:#010x})",
                info.checksum
            )));
        }
        Ok(info)
    }

    /// Number of live documents visible to this snapshot.
    pub fn doc_count(&self) -> u64 {
        let total: u64 = self.segments.iter().map(|s| s.doc_count).sum();
        let deleted = self
            .tombstones
            .iter()
            .filter(|id| self.segments.iter().any(|s| s.contains(**id)))
            .count() as u64;
        total - deleted
    }

    /// Number of segments in this snapshot.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of tombstoned documents in this snapshot.
    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    /// Whether `doc_id` is tombstoned.
    pub fn is_deleted(&self, doc_id: u64) -> bool {
        self.tombstones.contains(&doc_id)
    }

    /// Document frequency of a `field:term` across all segments.
    ///
    /// Tombstones are not subtracted here; document frequency is a
    /// corpus-level statistic and deletes only stop a document from being
    /// returned.
    pub fn doc_frequency(&self, full_term: &str) -> Result<u64> {
        let mut df = 0;
        for info in &self.segments {
            if let Some(bytes) = self.storage.get(&segment::term_key(info.id, full_term))? {
                let entry: TermInfo = serde_json::from_slice(&bytes)?;
                df += entry.doc_freq;
            }
        }
        Ok(df)
    }

    /// Total occurrence count of a `field:term` across all segments.
    pub fn total_term_frequency(&self, full_term: &str) -> Result<u64> {
        let mut tf = 0;
        for info in &self.segments {
            if let Some(bytes) = self.storage.get(&segment::term_key(info.id, full_term))? {
                let entry: TermInfo = serde_json::from_slice(&bytes)?;
                tf += entry.total_freq;
            }
        }
        Ok(tf)
    }

    /// Merged postings for a `field:term`, ascending by doc id, tombstones
    /// filtered. An absent term yields an empty iterator, not an error.
    pub fn postings(&self, full_term: &str) -> Result<PostingsIter> {
        let mut lists = Vec::new();
        for info in &self.segments {
            if let Some(bytes) = self
                .storage
                .get(&segment::postings_key(info.id, full_term))?
            {
                let list: PostingsList = serde_json::from_slice(&bytes)?;
                lists.push(list);
            }
        }
        Ok(PostingsIter {
            inner: MergedPostings::new(lists),
            tombstones: self.tombstones.clone(),
        })
    }

    /// All full terms starting with `prefix`, deduplicated across segments,
    /// ascending. Wildcard expansion scans with a `field:` prefix.
    pub fn terms_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut terms = BTreeSet::new();
        for info in &self.segments {
            let key_prefix = format!("{}{prefix}", segment::term_prefix(info.id));
            let strip = segment::term_prefix(info.id);
            for (key, _) in self.storage.range_prefix(&key_prefix)? {
                terms.insert(key[strip.len()..].to_string());
            }
        }
        Ok(terms.into_iter().collect())
    }

    /// Stored fields of a document, or `NotFound` if the id was never
    /// flushed or is tombstoned.
    pub fn document(&self, doc_id: u64) -> Result<Document> {
        if self.is_deleted(doc_id) {
            return Err(ChrysalisError::not_found(format!(
                "document {doc_id} is deleted"
            )));
        }
        for info in &self.segments {
            if !info.contains(doc_id) {
                continue;
            }
            if let Some(bytes) = self.storage.get(&segment::doc_key(info.id, doc_id))? {
                return Ok(serde_json::from_slice(&bytes)?);
            }
        }
        Err(ChrysalisError::not_found(format!(
            "document {doc_id} does not exist in this snapshot"
        )))
    }

    /// Text of one frame of a document.
    pub fn frame(&self, doc_id: u64, seq: u32) -> Result<String> {
        if self.is_deleted(doc_id) {
            return Err(ChrysalisError::not_found(format!(
                "document {doc_id} is deleted"
            )));
        }
        for info in &self.segments {
            if !info.contains(doc_id) {
                continue;
            }
            if let Some(bytes) = self
                .storage
                .get(&segment::frame_key(info.id, doc_id, seq))?
            {
                return Ok(serde_json::from_slice(&bytes)?);
            }
        }
        Err(ChrysalisError::not_found(format!(
            "frame {seq} of document {doc_id} does not exist"
        )))
    }

    /// All frame texts of a document, in sequence order.
    pub fn frames(&self, doc_id: u64) -> Result<Vec<String>> {
        if self.is_deleted(doc_id) {
            return Err(ChrysalisError::not_found(format!(
                "document {doc_id} is deleted"
            )));
        }
        for info in &self.segments {
            if !info.contains(doc_id) {
                continue;
            }
            let entries = self
                .storage
                .range_prefix(&segment::frame_doc_prefix(info.id, doc_id))?;
            if !entries.is_empty() {
                let mut frames = Vec::with_capacity(entries.len());
                for (_, bytes) in entries {
                    frames.push(serde_json::from_slice(&bytes)?);
                }
                return Ok(frames);
            }
        }
        Ok(Vec::new())
    }

    /// The manifest this reader is pinned to.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}
