//! Postings lists and the N-way segment merge.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

/// One occurrence of a term inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Frame the occurrence belongs to.
    pub frame: u32,
    /// Field-wide token position. Monotonic across frames; phrase queries
    /// test adjacency on this.
    pub position: u32,
    /// Byte offset of the occurrence in the original field text.
    pub offset: usize,
}

/// A term's entry for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Document id.
    pub doc_id: u64,
    /// Occurrence positions, ascending. Empty for atomic (non-text) terms,
    /// which count as a single occurrence.
    pub positions: Vec<Position>,
}

impl Posting {
    /// Term frequency within the document.
    pub fn term_frequency(&self) -> u64 {
        self.positions.len().max(1) as u64
    }
}

/// A term's postings in one segment, sorted ascending by doc id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingsList {
    postings: Vec<Posting>,
}

impl PostingsList {
    /// Wrap an already doc-id-sorted vector.
    pub fn from_sorted(postings: Vec<Posting>) -> Self {
        PostingsList { postings }
    }

    /// Whether doc ids are strictly increasing. A violation means the writer
    /// produced a duplicate or out-of-order posting, which is fatal.
    pub fn is_strictly_sorted(&self) -> bool {
        self.postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id)
    }

    /// Number of documents in the list.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// The postings, ascending by doc id.
    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    /// Consume into the underlying vector.
    pub fn into_postings(self) -> Vec<Posting> {
        self.postings
    }
}

/// Heap entry for the merge. Ordered so the smallest head doc id pops first.
struct MergeHead {
    doc_id: u64,
    list: usize,
}

impl PartialEq for MergeHead {
    fn eq(&self, other: &Self) -> bool {
        self.doc_id == other.doc_id && self.list == other.list
    }
}

impl Eq for MergeHead {}

impl PartialOrd for MergeHead {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeHead {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior on BinaryHeap.
        other
            .doc_id
            .cmp(&self.doc_id)
            .then_with(|| other.list.cmp(&self.list))
    }
}

/// Lazy N-way merge of per-segment postings lists, ascending by doc id.
///
/// Each input list contributes one heap entry at a time, so the merge does
/// O(total postings · log segments) work and never materializes the merged
/// list up front.
pub struct MergedPostings {
    lists: Vec<std::vec::IntoIter<Posting>>,
    heap: BinaryHeap<MergeHead>,
    pending: Vec<Option<Posting>>,
}

impl MergedPostings {
    /// Merge the given lists. Each must already be sorted by doc id.
    pub fn new(lists: Vec<PostingsList>) -> Self {
        let mut iters: Vec<std::vec::IntoIter<Posting>> = lists
            .into_iter()
            .map(|l| l.into_postings().into_iter())
            .collect();
        let mut heap = BinaryHeap::with_capacity(iters.len());
        let mut pending: Vec<Option<Posting>> = Vec::with_capacity(iters.len());
        for (i, iter) in iters.iter_mut().enumerate() {
            match iter.next() {
                Some(p) => {
                    heap.push(MergeHead {
                        doc_id: p.doc_id,
                        list: i,
                    });
                    pending.push(Some(p));
                }
                None => pending.push(None),
            }
        }
        MergedPostings {
            lists: iters,
            heap,
            pending,
        }
    }
}

impl Iterator for MergedPostings {
    type Item = Posting;

    fn next(&mut self) -> Option<Posting> {
        let head = self.heap.pop()?;
        let posting = self.pending[head.list].take();
        if let Some(next) = self.lists[head.list].next() {
            self.heap.push(MergeHead {
                doc_id: next.doc_id,
                list: head.list,
            });
            self.pending[head.list] = Some(next);
        }
        posting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(doc_id: u64) -> Posting {
        Posting {
            doc_id,
            positions: vec![],
        }
    }

    #[test]
    fn test_merge_interleaved() {
        let a = PostingsList::from_sorted(vec![posting(1), posting(4), posting(9)]);
        let b = PostingsList::from_sorted(vec![posting(2), posting(3)]);
        let c = PostingsList::from_sorted(vec![posting(7)]);

        let merged: Vec<u64> = MergedPostings::new(vec![a, b, c])
            .map(|p| p.doc_id)
            .collect();
        assert_eq!(merged, vec![1, 2, 3, 4, 7, 9]);
    }

    #[test]
    fn test_merge_empty_lists() {
        let merged: Vec<Posting> =
            MergedPostings::new(vec![PostingsList::default(), PostingsList::default()]).collect();
        assert!(merged.is_empty());
    }

    #[test]
    fn test_strictly_sorted_detects_duplicates() {
        let good = PostingsList::from_sorted(vec![posting(1), posting(2)]);
        let bad = PostingsList::from_sorted(vec![posting(2), posting(2)]);
        assert!(good.is_strictly_sorted());
        assert!(!bad.is_strictly_sorted());
    }

    #[test]
    fn test_atomic_term_frequency_is_one() {
        assert_eq!(posting(1).term_frequency(), 1);
    }
}
