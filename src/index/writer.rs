//! Index writer: document buffering, segment flush, tombstone deletes.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ahash::AHashMap;
use crc32fast::Hasher;
use parking_lot::Mutex;

use crate::analysis::Analyzer;
use crate::document::Document;
use crate::error::{ChrysalisError, Result};
use crate::index::postings::{Position, Posting, PostingsList};
use crate::index::segment::{
    self, Manifest, SegmentInfo, TermInfo, MANIFEST_KEY,
};
use crate::schema::{FieldKind, Schema};
use crate::storage::{StorageRef, WriteBatch};

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct IndexWriterConfig {
    /// Buffered documents that trigger an automatic flush.
    pub max_buffered_docs: usize,
    /// Analyzer applied to TEXT fields.
    pub analyzer: Arc<Analyzer>,
}

impl Default for IndexWriterConfig {
    fn default() -> Self {
        IndexWriterConfig {
            max_buffered_docs: 10_000,
            analyzer: Arc::new(Analyzer::default()),
        }
    }
}

/// Statistics about the writing process.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriterStats {
    /// Documents added since the writer opened.
    pub docs_added: u64,
    /// Distinct terms written across all flushed segments.
    pub unique_terms: u64,
    /// Postings written across all flushed segments.
    pub total_postings: u64,
    /// Segments created by this writer.
    pub segments_created: u64,
    /// Tombstones recorded by this writer.
    pub docs_deleted: u64,
}

/// Buffered state, guarded by one mutex so concurrent `add_document` calls
/// are safe and doc ids stay strictly monotonic.
#[derive(Debug)]
struct WriterState {
    manifest: Manifest,
    /// full term -> postings under construction, appended in doc id order.
    terms: AHashMap<String, Vec<Posting>>,
    /// (doc id, stored fields) for buffered documents.
    docs: Vec<(u64, Document)>,
    /// (doc id, frame seq, frame text) for buffered documents.
    frames: Vec<(u64, u32, String)>,
    /// Tombstones awaiting publication at the next flush.
    pending_tombstones: Vec<u64>,
    buffered_docs: usize,
    stats: WriterStats,
}

/// Writes documents into immutable segments.
///
/// Documents are validated against the schema, analyzed, and buffered in
/// memory; `flush` turns the buffer into a new segment published atomically
/// through the storage batch. One writer per index; the [`Index`] facade
/// enforces this.
///
/// [`Index`]: crate::index::Index
#[derive(Debug)]
pub struct IndexWriter {
    storage: StorageRef,
    schema: Arc<Schema>,
    config: IndexWriterConfig,
    state: Mutex<WriterState>,
}

impl IndexWriter {
    /// Open a writer, resuming the doc id counter from the manifest.
    pub fn new(storage: StorageRef, schema: Arc<Schema>, config: IndexWriterConfig) -> Result<Self> {
        let manifest = match storage.get(MANIFEST_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => Manifest::default(),
        };
        Ok(IndexWriter {
            storage,
            schema,
            config,
            state: Mutex::new(WriterState {
                manifest,
                terms: AHashMap::new(),
                docs: Vec::new(),
                frames: Vec::new(),
                pending_tombstones: Vec::new(),
                buffered_docs: 0,
                stats: WriterStats::default(),
            }),
        })
    }

    /// Add a document, returning its assigned id.
    ///
    /// TEXT fields go through the full analysis pipeline; CATEGORICAL_TEXT,
    /// ID, NUMERIC and BOOLEAN fields index as single atomic terms. Stored
    /// field values and frame texts are buffered alongside the postings.
    pub fn add_document(&self, doc: Document) -> Result<u64> {
        // Validate and analyze before taking the lock; only the id
        // assignment and buffer append need serialization.
        let mut analyzed: Vec<(String, Vec<Position>)> = Vec::new();
        let mut stored = Document::new();
        let mut frames: Vec<String> = Vec::new();
        let mut frame_base = 0u32;

        for (name, value) in doc.fields() {
            let spec = self.schema.validate(name, value)?;
            if spec.indexed {
                match spec.kind {
                    FieldKind::Text => {
                        let text = value.as_text().ok_or_else(|| {
                            ChrysalisError::schema(format!("field '{name}' is not text"))
                        })?;
                        let out = self.config.analyzer.analyze(text)?;
                        let mut positions: AHashMap<String, Vec<Position>> = AHashMap::new();
                        for token in &out.tokens {
                            positions
                                .entry(segment::full_term(name, &token.text))
                                .or_default()
                                .push(Position {
                                    frame: token.frame + frame_base,
                                    position: token.position,
                                    offset: token.start,
                                });
                        }
                        analyzed.extend(positions);
                        for frame in &out.frames {
                            frames.push(frame.text(text).to_string());
                        }
                        frame_base += out.frames.len() as u32;
                    }
                    _ => {
                        analyzed.push((segment::full_term(name, &value.atomic_term()), Vec::new()));
                    }
                }
            }
            if spec.stored {
                stored = stored.add_field(name.clone(), value.clone());
            }
        }

        let mut state = self.state.lock();
        let doc_id = state.manifest.next_doc_id;
        state.manifest.next_doc_id += 1;

        for (term, positions) in analyzed {
            state
                .terms
                .entry(term)
                .or_default()
                .push(Posting { doc_id, positions });
        }
        for (seq, text) in frames.into_iter().enumerate() {
            state.frames.push((doc_id, seq as u32, text));
        }
        state.docs.push((doc_id, stored));
        state.buffered_docs += 1;
        state.stats.docs_added += 1;

        if state.buffered_docs >= self.config.max_buffered_docs {
            self.flush_locked(&mut state)?;
        }
        Ok(doc_id)
    }

    /// Record a tombstone for `doc_id`, published at the next flush. The
    /// segment holding the document is never rewritten.
    pub fn delete_document(&self, doc_id: u64) -> Result<()> {
        let mut state = self.state.lock();
        if doc_id >= state.manifest.next_doc_id {
            return Err(ChrysalisError::not_found(format!(
                "document {doc_id} was never assigned"
            )));
        }
        state.pending_tombstones.push(doc_id);
        state.stats.docs_deleted += 1;
        Ok(())
    }

    /// Flush buffered documents into a new segment.
    ///
    /// Every key of the segment, plus the manifest rewrite publishing it,
    /// goes through one atomic write batch. If the batch fails the previous
    /// manifest and all buffered state remain intact and the flush can be
    /// retried.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.flush_locked(&mut state)
    }

    /// Flush and publish. Alias for `flush`; the facade invalidates its
    /// cached reader on commit.
    pub fn commit(&self) -> Result<()> {
        self.flush()
    }

    /// Discard all buffered documents and pending tombstones. Already
    /// assigned doc ids stay burned; the counter never moves backwards.
    pub fn rollback(&self) {
        let mut state = self.state.lock();
        let dropped = state.buffered_docs;
        state.terms.clear();
        state.docs.clear();
        state.frames.clear();
        state.pending_tombstones.clear();
        state.buffered_docs = 0;
        log::debug!("writer rollback dropped {dropped} buffered docs");
    }

    /// Number of buffered, not yet flushed documents.
    pub fn pending_docs(&self) -> usize {
        self.state.lock().buffered_docs
    }

    /// A snapshot of the writer statistics.
    pub fn stats(&self) -> WriterStats {
        self.state.lock().stats
    }

    fn flush_locked(&self, state: &mut WriterState) -> Result<()> {
        if state.docs.is_empty() && state.pending_tombstones.is_empty() {
            return Ok(());
        }

        let mut manifest = state.manifest.clone();
        manifest
            .tombstones
            .extend(state.pending_tombstones.iter().copied());
        manifest.tombstones.sort_unstable();
        manifest.tombstones.dedup();

        let mut batch = WriteBatch::new();
        let mut segment_id = None;
        let mut flushed_terms = 0u64;
        let mut flushed_postings = 0u64;

        if !state.docs.is_empty() {
            let id = manifest.next_segment_id;
            segment_id = Some(id);

            // Sorted term order makes the checksum deterministic and the
            // on-storage layout scan-friendly.
            let mut terms: Vec<(&String, &Vec<Posting>)> = state.terms.iter().collect();
            terms.sort_unstable_by(|a, b| a.0.cmp(b.0));

            let mut hasher = Hasher::new();
            for (term, postings) in &terms {
                let list = PostingsList::from_sorted((*postings).clone());
                if !list.is_strictly_sorted() {
                    return Err(ChrysalisError::index(format!(
                        "postings for term '{term}' are duplicated or out of order"
                    )));
                }
                let info = TermInfo {
                    doc_freq: list.len() as u64,
                    total_freq: list.postings().iter().map(|p| p.term_frequency()).sum(),
                };
                flushed_postings += list.len() as u64;

                let term_key = segment::term_key(id, term);
                let term_value = serde_json::to_vec(&info)?;
                let post_key = segment::postings_key(id, term);
                let post_value = serde_json::to_vec(&list)?;

                // The reader recomputes this hash over the same key/value
                // byte sequence on open.
                hasher.update(term_key.as_bytes());
                hasher.update(&term_value);
                hasher.update(post_key.as_bytes());
                hasher.update(&post_value);

                batch.put(term_key, term_value);
                batch.put(post_key, post_value);
            }

            // Docs and frames are buffered in doc id order, so this matches
            // the sorted key order the reader rehashes them in.
            for (doc_id, doc) in &state.docs {
                let doc_key = segment::doc_key(id, *doc_id);
                let doc_value = serde_json::to_vec(doc)?;
                hasher.update(doc_key.as_bytes());
                hasher.update(&doc_value);
                batch.put(doc_key, doc_value);
            }
            for (doc_id, seq, text) in &state.frames {
                let frame_key = segment::frame_key(id, *doc_id, *seq);
                let frame_value = serde_json::to_vec(text)?;
                hasher.update(frame_key.as_bytes());
                hasher.update(&frame_value);
                batch.put(frame_key, frame_value);
            }

            let min_doc_id = state.docs.iter().map(|(id, _)| *id).min().unwrap_or(0);
            let max_doc_id = state.docs.iter().map(|(id, _)| *id).max().unwrap_or(0);
            let info = SegmentInfo {
                id,
                doc_count: state.docs.len() as u64,
                min_doc_id,
                max_doc_id,
                term_count: terms.len() as u64,
                checksum: hasher.finalize(),
                created_at: SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0),
            };
            batch.put(segment::meta_key(id), serde_json::to_vec(&info)?);

            manifest.segments.push(id);
            manifest.next_segment_id += 1;
            flushed_terms = terms.len() as u64;
        }

        // The manifest rewrite rides in the same batch as the segment data,
        // so publication is all-or-nothing.
        batch.put(MANIFEST_KEY, serde_json::to_vec(&manifest)?);

        self.storage.write_batch(batch).map_err(|e| {
            ChrysalisError::flush(format!("segment flush failed, buffers retained: {e}"))
        })?;

        // Stats move only after the batch lands; a failed flush leaves them
        // describing the published state.
        let flushed_docs = state.docs.len();
        state.manifest = manifest;
        state.terms.clear();
        state.docs.clear();
        state.frames.clear();
        state.pending_tombstones.clear();
        state.buffered_docs = 0;
        state.stats.unique_terms += flushed_terms;
        state.stats.total_postings += flushed_postings;
        if let Some(id) = segment_id {
            state.stats.segments_created += 1;
            log::info!("flushed segment {id} with {flushed_docs} docs");
        }
        Ok(())
    }
}
