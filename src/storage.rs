//! Storage abstraction for index persistence.
//!
//! The engine only requires a transactional key-value contract from its
//! storage collaborator: point lookup, ordered range scan by key prefix, and
//! an all-or-nothing write batch. Durability guarantees belong to the
//! implementation, not to the engine.

pub mod file;
pub mod memory;

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;

/// A single operation inside a write batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Insert or overwrite a key.
    Put { key: String, value: Vec<u8> },
    /// Remove a key if present.
    Delete { key: String },
}

/// An ordered set of writes applied atomically.
///
/// Either every operation in the batch becomes visible or none do. The
/// writer relies on this for flush atomicity: the manifest update that
/// publishes a segment rides in the same batch as the segment's data.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        WriteBatch::default()
    }

    /// Queue a put.
    pub fn put<K: Into<String>>(&mut self, key: K, value: Vec<u8>) {
        self.ops.push(BatchOp::Put {
            key: key.into(),
            value,
        });
    }

    /// Queue a delete.
    pub fn delete<K: Into<String>>(&mut self, key: K) {
        self.ops.push(BatchOp::Delete { key: key.into() });
    }

    /// The queued operations, in order.
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Transactional key-value storage contract.
///
/// Implementations must provide atomic batch application and ordered
/// (lexicographic by key) prefix scans. All calls are synchronous and
/// blocking from the engine's point of view.
pub trait Storage: Send + Sync + Debug {
    /// Fetch the value for a key, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Scan all `(key, value)` pairs whose key starts with `prefix`, in
    /// ascending key order.
    fn range_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;

    /// Apply a batch of writes atomically. On error nothing in the batch is
    /// visible.
    fn write_batch(&self, batch: WriteBatch) -> Result<()>;
}

/// Shared handle to a storage backend.
pub type StorageRef = Arc<dyn Storage>;
