//! HNSW insertion algorithm.
//!
//! Inserts a vector into the HNSW graph with bidirectional connections and
//! heuristic neighbor pruning (Algorithm 4 from the HNSW paper).

use crate::error::{IndexError, Result};
use crate::hnsw::graph::HnswIndex;
use crate::hnsw::search::{greedy_descent, search_layer};
use crate::hnsw::visited::VisitedSet;
use std::collections::HashSet;

impl HnswIndex {
    /// Insert a new vector into the HNSW index.
    ///
    /// `internal_id` must equal the current node count. Every check runs
    /// before the graph is touched, so a failed insert leaves it unchanged.
    pub fn insert(&mut self, internal_id: u32, vector: &[f32]) -> Result<()> {
        self.check_vector(vector)?;
        if self.len() >= self.config.max_elements {
            return Err(IndexError::CapacityExceeded {
                max_elements: self.config.max_elements,
            });
        }
        if internal_id != self.node_count {
            return Err(IndexError::IdOutOfSequence {
                expected: self.node_count,
                actual: internal_id,
            });
        }

        let level = self.random_level(internal_id);

        // First node: no links to build
        let Some(entry_point) = self.entry_point else {
            self.push_node(vector, vec![Vec::new(); level + 1], level);
            self.entry_point = Some(internal_id);
            self.max_layer = level;
            tracing::debug!(id = internal_id, level, "inserted first node");
            return Ok(());
        };

        let mut visited = VisitedSet::new(self.len());

        // Phase 1: greedy descent through the layers above the new node's level
        let current_ep = greedy_descent(self, vector, entry_point, level, &mut visited);

        // Phase 2: beam search each shared layer and pick neighbors
        let top = level.min(self.max_layer);
        let mut node_neighbors: Vec<Vec<u32>> = vec![Vec::new(); level + 1];
        let mut layer_eps: Vec<u32> = vec![current_ep];
        for layer in (0..=top).rev() {
            let candidates = search_layer(
                self,
                vector,
                &layer_eps,
                self.config.ef_construction,
                layer,
                &mut visited,
            );

            let selected =
                select_neighbors_heuristic(self, &candidates, self.config.max_degree(layer));
            node_neighbors[layer] = selected.iter().map(|&(_, id)| id).collect();

            // Entry points for the next (lower) layer
            layer_eps.clear();
            layer_eps.extend(candidates.iter().map(|&(_, id)| id));
            if layer_eps.is_empty() {
                layer_eps.push(entry_point);
            }
        }

        self.push_node(vector, node_neighbors, level);

        // Phase 3: add reverse links and prune over-capacity neighbor lists
        for layer in 0..=top {
            let m_max = self.config.max_degree(layer);
            let my_neighbors = self.neighbors[internal_id as usize][layer].clone();
            for neighbor_id in my_neighbors {
                let nid = neighbor_id as usize;
                self.neighbors[nid][layer].push(internal_id);

                if self.neighbors[nid][layer].len() > m_max {
                    let base = self.get_vector(neighbor_id);
                    let candidates: Vec<(f32, u32)> = self.neighbors[nid][layer]
                        .iter()
                        .map(|&cid| {
                            let dist = self
                                .config
                                .distance_metric
                                .distance_unchecked(base, self.get_vector(cid));
                            (dist, cid)
                        })
                        .collect();
                    let pruned = select_neighbors_heuristic(self, &candidates, m_max);
                    self.neighbors[nid][layer] = pruned.iter().map(|&(_, id)| id).collect();
                }
            }
        }

        // Update entry point if new node has higher layer
        if level > self.max_layer {
            tracing::debug!(
                id = internal_id,
                from = self.max_layer,
                to = level,
                "entry point promoted"
            );
            self.max_layer = level;
            self.entry_point = Some(internal_id);
        }
        Ok(())
    }

    fn push_node(&mut self, vector: &[f32], neighbors: Vec<Vec<u32>>, level: usize) {
        self.vectors.extend_from_slice(vector);
        self.neighbors.push(neighbors);
        self.layers.push(level as u8);
        self.node_count += 1;
    }
}

/// Most links a neighbor list keeps to nodes sharing one exact embedding.
const MAX_COPY_LINKS: usize = 2;

/// Heuristic neighbor selection (Algorithm 4 from the HNSW paper).
///
/// A candidate is selected only if it is closer to the base node than to any
/// already-selected neighbor, which avoids clusters of near-identical links.
/// Slots the heuristic leaves empty are filled with the closest unused
/// candidates.
///
/// Candidates with identical embeddings are first collapsed to the oldest and
/// newest id of each group. Every distance inside such a group ties, so
/// without this a list could fill up with copies and cut the copies off from
/// the rest of the graph.
fn select_neighbors_heuristic(
    index: &HnswIndex,
    candidates: &[(f32, u32)],
    m: usize,
) -> Vec<(f32, u32)> {
    let mut sorted = candidates.to_vec();
    sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    let sorted = collapse_copies(index, &sorted);

    let metric = index.config.distance_metric;
    let mut selected: Vec<(f32, u32)> = Vec::with_capacity(m);

    for &(dist_to_base, cid) in &sorted {
        if selected.len() >= m {
            break;
        }
        let candidate = index.get_vector(cid);
        let is_diverse = selected.iter().all(|&(_, sid)| {
            let other = index.get_vector(sid);
            other == candidate || dist_to_base <= metric.distance_unchecked(candidate, other)
        });
        if is_diverse {
            selected.push((dist_to_base, cid));
        }
    }

    if selected.len() < m {
        let selected_ids: HashSet<u32> = selected.iter().map(|&(_, id)| id).collect();
        for &(dist, cid) in &sorted {
            if selected.len() >= m {
                break;
            }
            if !selected_ids.contains(&cid) {
                selected.push((dist, cid));
            }
        }
    }

    selected
}

/// Keeps at most [`MAX_COPY_LINKS`] ids per exact embedding: the oldest and
/// the newest. `sorted` must be ordered by `(distance, id)`, so copies of one
/// embedding sit in the same equal-distance run.
fn collapse_copies(index: &HnswIndex, sorted: &[(f32, u32)]) -> Vec<(f32, u32)> {
    let mut out: Vec<(f32, u32)> = Vec::with_capacity(sorted.len());
    // (position of the oldest copy in `out`, number of ids kept) per group in the current run
    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut run_distance: Option<f32> = None;

    for &(dist, id) in sorted {
        if run_distance != Some(dist) {
            run_distance = Some(dist);
            groups.clear();
        }
        let vector = index.get_vector(id);
        let group = groups
            .iter_mut()
            .find(|(first, _)| index.get_vector(out[*first].1) == vector);
        match group {
            None => {
                groups.push((out.len(), 1));
                out.push((dist, id));
            }
            Some((_, kept)) if *kept < MAX_COPY_LINKS => {
                *kept += 1;
                out.push((dist, id));
            }
            Some((first, _)) => {
                // Ids ascend within the run: replace the newest kept copy.
                let newest = out[*first + 1..]
                    .iter()
                    .rposition(|&(_, o)| index.get_vector(o) == vector)
                    .map(|p| *first + 1 + p);
                if let Some(pos) = newest {
                    out[pos] = (dist, id);
                }
            }
        }
    }
    out
}
