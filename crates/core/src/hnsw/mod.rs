//! Hierarchical Navigable Small World (HNSW) approximate nearest neighbor index.
//!
//! Embeddings are stored as raw f32 in one contiguous arena and every
//! distance is computed exactly. The graph uses a Struct-of-Arrays layout:
//! separate arrays for embeddings, neighbor lists and layer assignments, all
//! indexed by the dense node id.

/// Distance metrics: cosine, squared euclidean, and negative inner product.
pub mod distance;
/// HNSW graph structure, configuration, and level assignment.
pub mod graph;
/// HNSW insertion algorithm with bidirectional connections and heuristic pruning.
pub mod insert;
/// HNSW search: single-layer beam search and multi-layer KNN.
pub mod search;
/// Generation-based visited set for efficient graph traversal.
pub mod visited;

pub use distance::DistanceMetric;
pub use graph::{HnswConfig, HnswIndex};
pub use search::knn_search;
