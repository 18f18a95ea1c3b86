//! Payload side table keyed by node id.

use crate::error::{IndexError, Result};
use std::collections::HashMap;

/// Maps a node id to the payload supplied with its embedding.
///
/// Entries are written once, right after the matching graph node, and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct PayloadTable<P> {
    entries: HashMap<u32, P>,
}

impl<P> Default for PayloadTable<P> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<P> PayloadTable<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Records `payload` under `id`. Id uniqueness is the caller's contract.
    pub fn put(&mut self, id: u32, payload: P) {
        let previous = self.entries.insert(id, payload);
        debug_assert!(previous.is_none(), "payload id {id} written twice");
    }

    pub fn get(&self, id: u32) -> Result<&P> {
        self.entries.get(&id).ok_or(IndexError::NotFound(id))
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending id order.
    pub fn iter_sorted(&self) -> Vec<(u32, &P)> {
        let mut rows: Vec<(u32, &P)> = self.entries.iter().map(|(&id, p)| (id, p)).collect();
        rows.sort_unstable_by_key(|&(id, _)| id);
        rows
    }
}

impl<P> FromIterator<(u32, P)> for PayloadTable<P> {
    fn from_iter<I: IntoIterator<Item = (u32, P)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
