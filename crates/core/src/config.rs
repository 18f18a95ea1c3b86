//! Configuration for locusdb indexes.
//!
//! Tuning defaults and hard limits are compile-time constants. Per-index
//! parameters live in [`IndexConfig`], which is fixed at construction and
//! stored inside every snapshot.

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default number of bidirectional links per HNSW node.
///
/// Higher values improve recall but increase memory and build time.
/// Typical range: 8–64. Default: 16.
pub const HNSW_DEFAULT_M: usize = 16;

/// Default ef parameter during HNSW index construction.
///
/// Controls the size of the dynamic candidate list during insertion.
/// Higher values produce a better graph but slow down build time.
pub const HNSW_DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Default ef parameter during HNSW search.
///
/// The effective value for a query is never below the requested result count.
pub const HNSW_DEFAULT_EF_SEARCH: usize = 50;

/// Maximum number of layers in the HNSW graph.
pub const HNSW_DEFAULT_MAX_LAYERS: usize = 16;

/// Seed mixed into per-node level sampling.
pub const HNSW_DEFAULT_LEVEL_SEED: u64 = 0x6c6f_6375_7364_6221;

/// Default hard ceiling on inserted vectors.
pub const DEFAULT_MAX_ELEMENTS: usize = 100;

/// Default embedding dimension.
pub const DEFAULT_DIMENSION: usize = 1536;

/// Default snapshot path.
pub const DEFAULT_STORAGE_LOCATION: &str = "index.db";

/// Default number of results returned by `Index::retrieve` callers that
/// have no preference.
pub const DEFAULT_NUMBER_OF_RESULTS: usize = 3;

/// Maximum allowed embedding dimension.
pub const MAX_DIMENSION: usize = 65_536;

/// Maximum allowed `M`. Layer 0 holds up to `2 * M` links.
pub const MAX_M: usize = 127;

/// Distance metric selector, spelled the way config files spell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Space {
    /// `1 - cosine_similarity`.
    #[serde(rename = "cosine")]
    Cosine,
    /// Squared Euclidean distance.
    #[serde(rename = "l2")]
    L2,
    /// Negative inner product.
    #[serde(rename = "ip")]
    InnerProduct,
}

impl Space {
    pub fn as_str(&self) -> &'static str {
        match self {
            Space::Cosine => "cosine",
            Space::L2 => "l2",
            Space::InnerProduct => "ip",
        }
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Space {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Space::Cosine),
            "l2" => Ok(Space::L2),
            "ip" => Ok(Space::InnerProduct),
            other => Err(IndexError::InvalidConfig(format!(
                "unknown space '{}', expected one of: cosine, l2, ip",
                other
            ))),
        }
    }
}

/// Construction parameters of an index.
///
/// Every field has a default, so a partial JSON object deserializes into a
/// usable config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Hard ceiling on the number of inserted vectors.
    pub max_elements: usize,
    /// Candidate list size during insertion.
    pub ef_construction: usize,
    /// Maximum neighbours per node on layers above 0.
    #[serde(alias = "M")]
    pub m: usize,
    /// Embedding length. Must equal the `dimensions` passed to `Index::new`.
    pub dim: usize,
    /// Distance metric.
    pub space: Space,
    /// Where `Index::persist` writes the snapshot.
    pub storage_location: PathBuf,
    /// Base candidate list size during retrieval.
    pub ef_search: usize,
    /// Seed for level sampling. Fixed seeds make graph construction reproducible.
    pub level_seed: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_elements: DEFAULT_MAX_ELEMENTS,
            ef_construction: HNSW_DEFAULT_EF_CONSTRUCTION,
            m: HNSW_DEFAULT_M,
            dim: DEFAULT_DIMENSION,
            space: Space::Cosine,
            storage_location: PathBuf::from(DEFAULT_STORAGE_LOCATION),
            ef_search: HNSW_DEFAULT_EF_SEARCH,
            level_seed: HNSW_DEFAULT_LEVEL_SEED,
        }
    }
}

impl IndexConfig {
    /// Default config for the given dimension.
    pub fn with_dimension(dim: usize) -> Self {
        Self {
            dim,
            ..Self::default()
        }
    }

    /// Rejects parameter combinations the graph cannot be built with.
    pub fn validate(&self) -> Result<()> {
        if self.dim == 0 || self.dim > MAX_DIMENSION {
            return Err(IndexError::InvalidConfig(format!(
                "dim must be in 1..={}, got {}",
                MAX_DIMENSION, self.dim
            )));
        }
        if self.m < 2 || self.m > MAX_M {
            return Err(IndexError::InvalidConfig(format!(
                "M must be in 2..={}, got {}",
                MAX_M, self.m
            )));
        }
        if self.ef_construction == 0 {
            return Err(IndexError::InvalidConfig(
                "ef_construction must be > 0".to_string(),
            ));
        }
        if self.ef_search == 0 {
            return Err(IndexError::InvalidConfig(
                "ef_search must be > 0".to_string(),
            ));
        }
        if self.max_elements == 0 || self.max_elements > u32::MAX as usize {
            return Err(IndexError::InvalidConfig(format!(
                "max_elements must be in 1..={}, got {}",
                u32::MAX,
                self.max_elements
            )));
        }
        Ok(())
    }
}
