//! Generation-stamped visited set for HNSW graph traversal.
//!
//! Node ids are dense, so a flat array indexed by id replaces a `HashSet<u32>`.
//! Resetting bumps a generation counter instead of zeroing the array.

/// Visited set keyed by dense node id.
///
/// `u16` stamps keep the array small; the full wipe happens once every
/// 65534 resets.
#[derive(Debug, Default)]
pub struct VisitedSet {
    stamps: Vec<u16>,
    generation: u16,
}

impl VisitedSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            stamps: vec![0u16; capacity],
            generation: 1,
        }
    }

    /// Forgets every visit and makes room for ids below `capacity`.
    pub fn reset(&mut self, capacity: usize) {
        if capacity > self.stamps.len() {
            self.stamps.resize(capacity, 0);
        }
        if self.generation == u16::MAX || self.generation == 0 {
            self.stamps.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    /// Marks `id` visited. Returns `true` the first time `id` is seen since
    /// the last reset.
    #[inline]
    pub fn insert(&mut self, id: u32) -> bool {
        let slot = &mut self.stamps[id as usize];
        if *slot == self.generation {
            false
        } else {
            *slot = self.generation;
            true
        }
    }
}
