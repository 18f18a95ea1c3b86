//! # locusdb-core
//!
//! Embeddable approximate nearest neighbor index: HNSW graph search over
//! fixed-length embeddings, a payload side table, and whole-index snapshots.
//!
//! ```text
//! Index → { HNSW graph (embeddings + links), Payload table }
//! Persistence: snapshot (magic + version + bincode + CRC32) → temp file → rename
//! ```
//!
//! ```no_run
//! use locusdb_core::{Index, IndexConfig, Vector};
//! use serde_json::json;
//!
//! let config = IndexConfig::with_dimension(3);
//! let index: Index = Index::new(3, config)?;
//! index.add_vector(Vector::new(vec![0.1, 0.2, 0.3], json!({"id": 0})), false)?;
//! let hits = index.retrieve(&[0.1, 0.2, 0.3], 1)?;
//! assert_eq!(hits[0].payload, json!({"id": 0}));
//! index.persist()?;
//! # Ok::<(), locusdb_core::IndexError>(())
//! ```

/// Tuning constants and per-index construction parameters.
pub mod config;
/// Error type and `Result` alias.
pub mod error;
/// HNSW approximate nearest neighbor graph: structure, search, insertion, and distance metrics.
pub mod hnsw;
/// Public index façade combining the graph and the payload table.
pub mod index;
/// Storage layer: payload table, snapshot codec, and atomic file persistence.
pub mod storage;
/// Input `Vector` and output `Retrieved` records.
pub mod vector;

pub use config::{IndexConfig, Space};
pub use error::{IndexError, Result};
pub use hnsw::DistanceMetric;
pub use index::Index;
pub use vector::{Retrieved, Vector};
