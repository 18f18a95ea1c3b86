//! HNSW search algorithms: single-layer beam search and multi-layer KNN.

use crate::error::Result;
use crate::hnsw::graph::HnswIndex;
use crate::hnsw::visited::VisitedSet;
use ordered_float::OrderedFloat;
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

thread_local! {
    /// Thread-local VisitedSet reused across searches on the same thread.
    static SEARCH_VISITED: RefCell<VisitedSet> = RefCell::new(VisitedSet::default());
}

/// A scored node. Ordered by distance, then id, so heap order is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Scored {
    distance: OrderedFloat<f32>,
    id: u32,
}

impl Scored {
    #[inline]
    fn new(distance: f32, id: u32) -> Self {
        Self {
            distance: OrderedFloat(distance),
            id,
        }
    }
}

/// Search a single layer of the HNSW graph.
///
/// Best-first expansion from `entry_points`, keeping at most `ef` results.
/// Returns `(distance, id)` pairs ascending by distance. `visited` is reset
/// at the start of each call.
pub fn search_layer(
    index: &HnswIndex,
    query: &[f32],
    entry_points: &[u32],
    ef: usize,
    layer: usize,
    visited: &mut VisitedSet,
) -> Vec<(f32, u32)> {
    visited.reset(index.len());
    let ef = ef.clamp(1, index.len().max(1));
    // Min-heap of nodes to expand
    let mut candidates: BinaryHeap<Reverse<Scored>> = BinaryHeap::with_capacity(ef * 2);
    // Max-heap of the best ef nodes found so far; top is the worst kept
    let mut results: BinaryHeap<Scored> = BinaryHeap::with_capacity(ef + 1);

    for &ep in entry_points {
        if visited.insert(ep) {
            let entry = Scored::new(index.distance_to(query, ep), ep);
            candidates.push(Reverse(entry));
            results.push(entry);
            if results.len() > ef {
                results.pop();
            }
        }
    }

    while let Some(Reverse(candidate)) = candidates.pop() {
        // If the closest candidate is farther than the worst result, stop
        if let Some(worst) = results.peek() {
            if results.len() >= ef && candidate.distance > worst.distance {
                break;
            }
        }

        for &neighbor_id in index.neighbors_of(candidate.id, layer) {
            if !visited.insert(neighbor_id) {
                continue;
            }

            let dist = index.distance_to(query, neighbor_id);
            let should_add = results.len() < ef
                || results
                    .peek()
                    .is_some_and(|worst| OrderedFloat(dist) < worst.distance);

            if should_add {
                let entry = Scored::new(dist, neighbor_id);
                candidates.push(Reverse(entry));
                results.push(entry);
                if results.len() > ef {
                    results.pop(); // remove worst
                }
            }
        }
    }

    results
        .into_sorted_vec()
        .into_iter()
        .map(|r| (r.distance.0, r.id))
        .collect()
}

/// Greedy single-path descent from the entry point down to `stop_layer + 1`.
/// Returns the closest node found on the last layer visited.
pub(crate) fn greedy_descent(
    index: &HnswIndex,
    query: &[f32],
    entry_point: u32,
    stop_layer: usize,
    visited: &mut VisitedSet,
) -> u32 {
    let mut current_ep = entry_point;
    for layer in (stop_layer + 1..=index.max_layer).rev() {
        let results = search_layer(
            index,
            query,
            std::slice::from_ref(&current_ep),
            1,
            layer,
            visited,
        );
        if let Some(&(_, nearest)) = results.first() {
            current_ep = nearest;
        }
    }
    current_ep
}

/// Multi-layer KNN search through the HNSW graph.
///
/// The query must already have passed [`HnswIndex::check_vector`]. The
/// layer-0 candidate list holds `max(ef, k)` entries. Returns at most `k`
/// `(distance, id)` pairs ascending by distance.
pub fn knn_search(index: &HnswIndex, query: &[f32], k: usize, ef: usize) -> Vec<(f32, u32)> {
    let entry_point = match index.entry_point {
        Some(ep) if k > 0 => ep,
        _ => return Vec::new(),
    };

    SEARCH_VISITED.with(|cell| {
        let mut visited = cell.borrow_mut();
        let current_ep = greedy_descent(index, query, entry_point, 0, &mut visited);
        let mut results = search_layer(
            index,
            query,
            std::slice::from_ref(&current_ep),
            ef.max(k),
            0,
            &mut visited,
        );
        results.truncate(k);
        results
    })
}

impl HnswIndex {
    /// Returns up to `k` nearest nodes to `query` as `(id, distance)`,
    /// ascending by distance. Fewer than `k` only when the graph holds
    /// fewer than `k` nodes.
    pub fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Result<Vec<(u32, f32)>> {
        self.check_vector(query)?;
        Ok(knn_search(self, query, k, ef_search)
            .into_iter()
            .map(|(distance, id)| (id, distance))
            .collect())
    }
}
