use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use chrysalis::document::Document;
use chrysalis::error::ChrysalisError;
use chrysalis::index::reader::IndexReader;
use chrysalis::index::writer::{IndexWriter, IndexWriterConfig};
use chrysalis::index::Index;
use chrysalis::query::TermQuery;
use chrysalis::schema::{FieldSpec, Schema};
use chrysalis::storage::file::FileStorage;
use chrysalis::storage::memory::MemoryStorage;
use chrysalis::storage::{Storage, StorageRef, WriteBatch};

fn body_schema() -> Schema {
    Schema::builder()
        .add_field("body", FieldSpec::text())
        .build()
        .unwrap()
}

/// Delegates to an inner store until armed, then fails every batch write.
#[derive(Debug)]
struct FlakyStorage {
    inner: MemoryStorage,
    failing: AtomicBool,
}

impl FlakyStorage {
    fn new() -> Self {
        FlakyStorage {
            inner: MemoryStorage::new(),
            failing: AtomicBool::new(false),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Storage for FlakyStorage {
    fn get(&self, key: &str) -> chrysalis::Result<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn range_prefix(&self, prefix: &str) -> chrysalis::Result<Vec<(String, Vec<u8>)>> {
        self.inner.range_prefix(prefix)
    }

    fn write_batch(&self, batch: WriteBatch) -> chrysalis::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChrysalisError::storage("injected batch failure"));
        }
        self.inner.write_batch(batch)
    }
}

#[test]
fn test_aborted_flush_leaves_prior_state_intact() -> chrysalis::Result<()> {
    let storage = Arc::new(FlakyStorage::new());
    let storage_ref: StorageRef = storage.clone();
    let writer = IndexWriter::new(
        storage_ref.clone(),
        Arc::new(body_schema()),
        IndexWriterConfig::default(),
    )?;

    writer.add_document(Document::new().add_text("body", "First durable document."))?;
    writer.flush()?;

    let stats_before = writer.stats();

    storage.set_failing(true);
    writer.add_document(Document::new().add_text("body", "Second unlucky document."))?;
    let err = writer.flush().unwrap_err();
    assert!(matches!(err, ChrysalisError::FlushFailure(_)));

    // The previous segment is still the published state, the buffer
    // survived for a retry, and the stats describe only published data.
    let reader = IndexReader::open(storage_ref.clone())?;
    assert_eq!(reader.doc_count(), 1);
    assert_eq!(reader.segment_count(), 1);
    assert_eq!(writer.pending_docs(), 1);
    let stats = writer.stats();
    assert_eq!(stats.unique_terms, stats_before.unique_terms);
    assert_eq!(stats.total_postings, stats_before.total_postings);
    assert_eq!(stats.segments_created, stats_before.segments_created);

    storage.set_failing(false);
    writer.flush()?;
    assert!(writer.stats().unique_terms > stats_before.unique_terms);
    let reader = IndexReader::open(storage_ref)?;
    assert_eq!(reader.doc_count(), 2);
    assert_eq!(reader.segment_count(), 2);
    Ok(())
}

#[test]
fn test_tombstone_delete_keeps_segment_data() -> chrysalis::Result<()> {
    let storage: StorageRef = Arc::new(MemoryStorage::new());
    let schema = body_schema();
    let index = Index::new(storage.clone(), schema);

    let keep = index.add_document(Document::new().add_text("body", "Keep this document."))?;
    let removed = index.add_document(Document::new().add_text("body", "Drop this document."))?;
    index.commit()?;

    let keys_before = storage.range_prefix("seg/")?.len();
    index.delete_document(removed)?;
    index.commit()?;

    // Deleting rewrote only the manifest; every segment key is untouched.
    assert_eq!(storage.range_prefix("seg/")?.len(), keys_before);

    let searcher = index.searcher()?;
    assert_eq!(
        searcher.filter(&TermQuery::new("body", "document"))?,
        vec![keep]
    );
    let err = index.reader()?.document(removed).unwrap_err();
    assert!(matches!(err, ChrysalisError::NotFound(_)));
    Ok(())
}

#[test]
fn test_reopen_from_disk_resumes_doc_ids() -> chrysalis::Result<()> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.db");

    {
        let index = Index::new(Arc::new(FileStorage::open(&path)?), body_schema());
        index.add_document(Document::new().add_text("body", "Written before restart."))?;
        index.commit()?;
    }

    let index = Index::new(Arc::new(FileStorage::open(&path)?), body_schema());
    let searcher = index.searcher()?;
    assert_eq!(searcher.count(&TermQuery::new("body", "restart"))?, 1);

    // The id counter continues across sessions.
    let next = index.add_document(Document::new().add_text("body", "Written after restart."))?;
    assert_eq!(next, 1);
    index.commit()?;
    assert_eq!(index.stats()?.doc_count, 2);
    Ok(())
}

#[test]
fn test_rollback_discards_uncommitted_documents() -> chrysalis::Result<()> {
    let index = Index::new(Arc::new(MemoryStorage::new()), body_schema());
    index.add_document(Document::new().add_text("body", "Committed document."))?;
    index.commit()?;

    index.add_document(Document::new().add_text("body", "Abandoned document."))?;
    index.rollback()?;
    index.commit()?;

    assert_eq!(index.stats()?.doc_count, 1);
    assert_eq!(index.searcher()?.count(&TermQuery::new("body", "abandoned"))?, 0);
    Ok(())
}
