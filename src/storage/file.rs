//! File-backed storage.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{ChrysalisError, Result};
use crate::storage::{BatchOp, Storage, WriteBatch};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    entries: BTreeMap<String, Vec<u8>>,
}

/// Storage persisting the whole key space to a single file.
///
/// Reads are served from memory. A write batch is applied to a copy of the
/// map, serialized to a sibling temp file and atomically renamed over the
/// data file, so a batch that fails mid-write leaves the previous file and
/// the in-memory state untouched.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    map: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl FileStorage {
    /// Open or create a storage file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let map = if path.exists() {
            let bytes = fs::read(&path)?;
            let snapshot: Snapshot = serde_json::from_slice(&bytes)
                .map_err(|e| ChrysalisError::storage(format!("unreadable storage file: {e}")))?;
            snapshot.entries
        } else {
            BTreeMap::new()
        };
        Ok(FileStorage {
            path,
            map: RwLock::new(map),
        })
    }

    fn persist(&self, map: &BTreeMap<String, Vec<u8>>) -> Result<()> {
        let snapshot = Snapshot {
            entries: map.clone(),
        };
        let bytes = serde_json::to_vec(&snapshot)?;
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn range_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let map = self.map.read();
        let mut results = Vec::new();
        for (key, value) in
            map.range::<String, _>((Bound::Included(prefix.to_string()), Bound::Unbounded))
        {
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.clone(), value.clone()));
        }
        Ok(results)
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        let mut map = self.map.write();
        // Apply to a copy first; memory state only changes once the rename
        // has landed.
        let mut next = map.clone();
        for op in batch.ops() {
            match op {
                BatchOp::Put { key, value } => {
                    next.insert(key.clone(), value.clone());
                }
                BatchOp::Delete { key } => {
                    next.remove(key);
                }
            }
        }
        self.persist(&next)?;
        *map = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reopen_sees_written_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.db");

        let storage = FileStorage::open(&path).unwrap();
        let mut batch = WriteBatch::new();
        batch.put("k", b"v".to_vec());
        storage.write_batch(batch).unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_prefix_scan_after_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.db");

        let storage = FileStorage::open(&path).unwrap();
        let mut batch = WriteBatch::new();
        batch.put("a/1", vec![1]);
        batch.put("a/2", vec![2]);
        batch.put("b/1", vec![3]);
        storage.write_batch(batch).unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        let hits = reopened.range_prefix("a/").unwrap();
        assert_eq!(hits.len(), 2);
    }
}
