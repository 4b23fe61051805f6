//! Index lifecycle: writer and reader management over a storage backend.

pub mod postings;
pub mod reader;
pub mod segment;
pub mod writer;

pub use postings::{MergedPostings, Position, Posting, PostingsList};
pub use reader::{IndexReader, PostingsIter};
pub use segment::{Manifest, SegmentInfo, TermInfo};
pub use writer::{IndexWriter, IndexWriterConfig, WriterStats};

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::document::Document;
use crate::error::Result;
use crate::query::searcher::{SearchResults, Searcher, SearcherConfig};
use crate::query::Query;
use crate::schema::Schema;
use crate::storage::StorageRef;

/// Aggregate statistics for an index.
#[derive(Debug, Clone, Copy)]
pub struct IndexStats {
    /// Live documents (tombstones subtracted).
    pub doc_count: u64,
    /// Segments in the current manifest.
    pub segment_count: usize,
    /// Tombstoned documents.
    pub tombstone_count: usize,
}

/// Facade owning the writer and reader lifecycles for one index.
///
/// The writer is created lazily and cached behind a mutex, which enforces
/// the single-active-writer discipline. The reader is cached behind a
/// read-write lock and invalidated on `commit`, so reads between commits
/// share one pinned snapshot.
#[derive(Debug)]
pub struct Index {
    storage: StorageRef,
    schema: Arc<Schema>,
    writer_config: IndexWriterConfig,
    writer: Mutex<Option<Arc<IndexWriter>>>,
    reader: RwLock<Option<Arc<IndexReader>>>,
}

impl Index {
    /// Open an index over `storage` with the default writer configuration.
    pub fn new(storage: StorageRef, schema: Schema) -> Self {
        Index::with_config(storage, schema, IndexWriterConfig::default())
    }

    /// Open an index with an explicit writer configuration.
    pub fn with_config(storage: StorageRef, schema: Schema, config: IndexWriterConfig) -> Self {
        Index {
            storage,
            schema: Arc::new(schema),
            writer_config: config,
            writer: Mutex::new(None),
            reader: RwLock::new(None),
        }
    }

    /// The schema this index was opened with.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn writer(&self) -> Result<Arc<IndexWriter>> {
        let mut guard = self.writer.lock();
        if let Some(writer) = guard.as_ref() {
            return Ok(writer.clone());
        }
        let writer = Arc::new(IndexWriter::new(
            self.storage.clone(),
            self.schema.clone(),
            self.writer_config.clone(),
        )?);
        *guard = Some(writer.clone());
        Ok(writer)
    }

    /// The current reader snapshot, opened lazily and cached until the next
    /// commit.
    pub fn reader(&self) -> Result<Arc<IndexReader>> {
        if let Some(reader) = self.reader.read().as_ref() {
            return Ok(reader.clone());
        }
        let mut guard = self.reader.write();
        // Another thread may have opened one while we upgraded the lock.
        if let Some(reader) = guard.as_ref() {
            return Ok(reader.clone());
        }
        let reader = Arc::new(IndexReader::open(self.storage.clone())?);
        *guard = Some(reader.clone());
        Ok(reader)
    }

    /// Add a document, returning its assigned id.
    pub fn add_document(&self, doc: Document) -> Result<u64> {
        self.writer()?.add_document(doc)
    }

    /// Record a tombstone for a document, effective at the next commit.
    pub fn delete_document(&self, doc_id: u64) -> Result<()> {
        self.writer()?.delete_document(doc_id)
    }

    /// Flush buffered documents and publish. Invalidates the cached reader
    /// so subsequent reads see the new segment.
    pub fn commit(&self) -> Result<()> {
        self.writer()?.commit()?;
        *self.reader.write() = None;
        Ok(())
    }

    /// Discard buffered, uncommitted documents and tombstones.
    pub fn rollback(&self) -> Result<()> {
        self.writer()?.rollback();
        Ok(())
    }

    /// A searcher over the current snapshot.
    pub fn searcher(&self) -> Result<Searcher> {
        Ok(Searcher::new(self.reader()?))
    }

    /// A searcher with an explicit configuration over the current snapshot.
    pub fn searcher_with_config(&self, config: SearcherConfig) -> Result<Searcher> {
        Ok(Searcher::with_config(self.reader()?, config))
    }

    /// Search the current snapshot.
    pub fn search(&self, query: &dyn Query, offset: usize, limit: usize) -> Result<SearchResults> {
        self.searcher()?.search(query, offset, limit)
    }

    /// Count documents matching a query in the current snapshot.
    pub fn count(&self, query: &dyn Query) -> Result<u64> {
        self.searcher()?.count(query)
    }

    /// Writer statistics.
    pub fn writer_stats(&self) -> Result<WriterStats> {
        Ok(self.writer()?.stats())
    }

    /// Aggregate index statistics from the current snapshot.
    pub fn stats(&self) -> Result<IndexStats> {
        let reader = self.reader()?;
        Ok(IndexStats {
            doc_count: reader.doc_count(),
            segment_count: reader.segment_count(),
            tombstone_count: reader.tombstone_count(),
        })
    }
}
