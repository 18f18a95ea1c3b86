//! HNSW graph structure and configuration.
//!
//! [`HnswConfig`] carries the tuning parameters (M, ef_construction, ef_search,
//! metric, capacity). [`HnswIndex`] stores the graph in Struct-of-Arrays
//! layout: one contiguous f32 arena for embeddings, and per-node layer and
//! neighbour arrays indexed by node id. There is no pointer-linked node type.

use crate::config::{self, IndexConfig};
use crate::error::{IndexError, Result};
use crate::hnsw::distance::DistanceMetric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration parameters for an HNSW graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Maximum links per node on layers above 0.
    pub m: usize,
    /// Maximum links per node at layer 0 (`2 * m`).
    pub m_max0: usize,
    /// Candidate list size during index construction.
    pub ef_construction: usize,
    /// Candidate list size during search (raised to `k` when smaller).
    pub ef_search: usize,
    /// Maximum number of layers in the graph.
    pub max_layers: usize,
    /// Hard ceiling on the number of nodes.
    pub max_elements: usize,
    /// Distance function for similarity computation.
    pub distance_metric: DistanceMetric,
    /// Seed for level sampling.
    pub level_seed: u64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: config::HNSW_DEFAULT_M,
            m_max0: config::HNSW_DEFAULT_M * 2,
            ef_construction: config::HNSW_DEFAULT_EF_CONSTRUCTION,
            ef_search: config::HNSW_DEFAULT_EF_SEARCH,
            max_layers: config::HNSW_DEFAULT_MAX_LAYERS,
            max_elements: config::DEFAULT_MAX_ELEMENTS,
            distance_metric: DistanceMetric::Cosine,
            level_seed: config::HNSW_DEFAULT_LEVEL_SEED,
        }
    }
}

impl From<&IndexConfig> for HnswConfig {
    fn from(c: &IndexConfig) -> Self {
        Self {
            m: c.m,
            m_max0: c.m * 2,
            ef_construction: c.ef_construction,
            ef_search: c.ef_search,
            max_layers: config::HNSW_DEFAULT_MAX_LAYERS,
            max_elements: c.max_elements,
            distance_metric: c.space.into(),
            level_seed: c.level_seed,
        }
    }
}

impl HnswConfig {
    /// Link budget for a node on `layer`.
    #[inline]
    pub fn max_degree(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m_max0
        } else {
            self.m
        }
    }
}

/// HNSW graph in Struct-of-Arrays layout. Node ids are dense and assigned
/// in insertion order, so every per-node array is indexed directly by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswIndex {
    pub config: HnswConfig,
    // SoA: f32 embedding arena, `dimension` floats per node
    pub vectors: Vec<f32>,
    // SoA: graph structure
    pub neighbors: Vec<Vec<Vec<u32>>>, // [node_id][layer][neighbor_ids]
    pub layers: Vec<u8>,
    // Index metadata
    pub entry_point: Option<u32>,
    pub max_layer: usize,
    pub dimension: usize,
    pub node_count: u32,
}

impl HnswIndex {
    /// Creates a new empty HNSW index with the given dimension and configuration.
    pub fn new(dimension: usize, config: HnswConfig) -> Self {
        let reserve = config.max_elements.min(1 << 16);
        Self {
            config,
            vectors: Vec::with_capacity(reserve * dimension),
            neighbors: Vec::with_capacity(reserve),
            layers: Vec::with_capacity(reserve),
            entry_point: None,
            max_layer: 0,
            dimension,
            node_count: 0,
        }
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.node_count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.node_count == 0
    }

    /// Draws the top layer for node `id`: `floor(-ln(U) / ln(M))`, capped at
    /// `max_layers - 1`.
    ///
    /// The generator is seeded from `(level_seed, id)`, so the same insertion
    /// sequence always yields the same graph.
    pub fn random_level(&self, id: u32) -> usize {
        let ml = 1.0 / (self.config.m as f64).ln();
        let seed = self
            .config
            .level_seed
            .wrapping_add((id as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15));
        let mut rng = StdRng::seed_from_u64(seed);
        // (0, 1]: keeps ln() finite
        let r: f64 = 1.0 - rng.gen::<f64>();
        let level = (-r.ln() * ml).floor() as usize;
        level.min(self.config.max_layers - 1)
    }

    /// Embedding of node `id`. O(1) slice into the contiguous arena.
    #[inline]
    pub fn get_vector(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    /// Embedding of node `id`, or `NotFound` when the id was never inserted.
    pub fn try_get_vector(&self, id: u32) -> Result<&[f32]> {
        if id >= self.node_count {
            return Err(IndexError::NotFound(id));
        }
        Ok(self.get_vector(id))
    }

    /// Top layer assigned to node `id`.
    #[inline]
    pub fn get_layer(&self, id: u32) -> u8 {
        self.layers[id as usize]
    }

    /// Neighbour ids of `id` on `layer`; empty above the node's top layer.
    pub fn neighbors_of(&self, id: u32, layer: usize) -> &[u32] {
        self.neighbors
            .get(id as usize)
            .and_then(|node| node.get(layer))
            .map_or(&[], |list| list.as_slice())
    }

    /// Checks that a query or embedding can be scored against this graph.
    pub fn check_vector(&self, v: &[f32]) -> Result<()> {
        if v.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: v.len(),
            });
        }
        self.config.distance_metric.validate(v)
    }

    /// Distance from `query` to node `id`.
    #[inline]
    pub(crate) fn distance_to(&self, query: &[f32], id: u32) -> f32 {
        self.config
            .distance_metric
            .distance_unchecked(query, self.get_vector(id))
    }

    /// Validate internal invariants after deserialization.
    ///
    /// Checks that all parallel arrays have consistent lengths, that the entry
    /// point and neighbour ids are in bounds, that neighbour lists respect the
    /// degree budget of their layer, and that no node exceeds the capacity.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let nc = self.node_count as usize;
        let dim = self.dimension;

        if dim == 0 {
            return Err("dimension is 0".to_string());
        }
        if self.config.m < 2 || self.config.m_max0 < self.config.m {
            return Err(format!(
                "invalid degree budget m={} m_max0={}",
                self.config.m, self.config.m_max0
            ));
        }
        if self.config.max_layers == 0 || self.config.max_layers > u8::MAX as usize + 1 {
            return Err(format!("invalid max_layers {}", self.config.max_layers));
        }
        if nc > self.config.max_elements {
            return Err(format!(
                "node_count {} > max_elements {}",
                nc, self.config.max_elements
            ));
        }
        if self.vectors.len() != nc * dim {
            return Err(format!(
                "vectors length {} != node_count({}) * dimension({})",
                self.vectors.len(),
                nc,
                dim
            ));
        }
        if self.neighbors.len() != nc {
            return Err(format!(
                "neighbors length {} != node_count {}",
                self.neighbors.len(),
                nc
            ));
        }
        if self.layers.len() != nc {
            return Err(format!(
                "layers length {} != node_count {}",
                self.layers.len(),
                nc
            ));
        }

        match self.entry_point {
            Some(ep) => {
                if ep as usize >= nc {
                    return Err(format!("entry_point {} >= node_count {}", ep, nc));
                }
                if self.layers[ep as usize] as usize != self.max_layer {
                    return Err(format!(
                        "entry_point {} sits on layer {}, max_layer is {}",
                        ep, self.layers[ep as usize], self.max_layer
                    ));
                }
            }
            None if nc > 0 => return Err("missing entry_point".to_string()),
            None => {}
        }

        for (node_id, node_neighbors) in self.neighbors.iter().enumerate() {
            let top = self.layers[node_id] as usize;
            if top >= self.config.max_layers || top > self.max_layer {
                return Err(format!("node {} has invalid layer {}", node_id, top));
            }
            if node_neighbors.len() != top + 1 {
                return Err(format!(
                    "node {} has {} layer lists, expected {}",
                    node_id,
                    node_neighbors.len(),
                    top + 1
                ));
            }
            for (layer, layer_neighbors) in node_neighbors.iter().enumerate() {
                if layer_neighbors.len() > self.config.max_degree(layer) {
                    return Err(format!(
                        "node {} layer {} has {} links (max {})",
                        node_id,
                        layer,
                        layer_neighbors.len(),
                        self.config.max_degree(layer)
                    ));
                }
                for &neighbor in layer_neighbors {
                    if neighbor as usize >= nc || neighbor as usize == node_id {
                        return Err(format!(
                            "neighbor {} invalid (node_count={}) at node {} layer {}",
                            neighbor, nc, node_id, layer
                        ));
                    }
                }
            }
        }

        if self.vectors.iter().any(|x| !x.is_finite()) {
            return Err("non-finite embedding component".to_string());
        }

        Ok(())
    }
}
