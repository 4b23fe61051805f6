//! In-memory storage backend.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use crate::error::Result;
use crate::storage::{BatchOp, Storage, WriteBatch};

/// A storage backend keeping everything in an ordered in-memory map.
///
/// Batches are applied under a single write lock, which makes them trivially
/// atomic with respect to concurrent readers.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    map: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn range_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let map = self.map.read();
        let mut results = Vec::new();
        for (key, value) in map.range::<String, _>((Bound::Included(prefix.to_string()), Bound::Unbounded)) {
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.clone(), value.clone()));
        }
        Ok(results)
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        let mut map = self.map.write();
        for op in batch.ops() {
            match op {
                BatchOp::Put { key, value } => {
                    map.insert(key.clone(), value.clone());
                }
                BatchOp::Delete { key } => {
                    map.remove(key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let storage = MemoryStorage::new();
        let mut batch = WriteBatch::new();
        batch.put("a", b"1".to_vec());
        batch.put("b", b"2".to_vec());
        storage.write_batch(batch).unwrap();

        assert_eq!(storage.get("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(storage.get("c").unwrap(), None);
    }

    #[test]
    fn test_range_prefix_ordered() {
        let storage = MemoryStorage::new();
        let mut batch = WriteBatch::new();
        batch.put("seg/1/term/b", vec![]);
        batch.put("seg/1/term/a", vec![]);
        batch.put("seg/2/term/c", vec![]);
        storage.write_batch(batch).unwrap();

        let hits = storage.range_prefix("seg/1/term/").unwrap();
        let keys: Vec<_> = hits.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["seg/1/term/a", "seg/1/term/b"]);
    }

    #[test]
    fn test_batch_delete() {
        let storage = MemoryStorage::new();
        let mut batch = WriteBatch::new();
        batch.put("k", b"v".to_vec());
        storage.write_batch(batch).unwrap();

        let mut batch = WriteBatch::new();
        batch.delete("k");
        storage.write_batch(batch).unwrap();

        assert_eq!(storage.get("k").unwrap(), None);
    }
}
