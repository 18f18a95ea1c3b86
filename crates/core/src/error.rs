//! Error type shared by every locusdb operation.

use std::io;
use thiserror::Error;

/// Failure of an index operation.
///
/// Every variant except [`IndexError::Io`] is raised before any in-memory
/// state is touched.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Embedding or query length differs from the index dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Insert attempted with the index already at `max_elements`.
    #[error("capacity exceeded: index holds the maximum of {max_elements} elements")]
    CapacityExceeded { max_elements: usize },

    /// Zero-norm vector under the cosine metric, or a non-finite component.
    #[error("degenerate vector: {0}")]
    DegenerateVector(&'static str),

    /// Internal id lookup failed. Indicates a broken graph/payload invariant.
    #[error("no entry for id {0}")]
    NotFound(u32),

    /// Graph insert called with an id other than the next node id.
    #[error("node id out of sequence: expected {expected}, got {actual}")]
    IdOutOfSequence { expected: u32, actual: u32 },

    /// Snapshot bytes could not be decoded or failed validation.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// Snapshot written by an unsupported format version.
    #[error("incompatible format version {found} (supported: {expected})")]
    IncompatibleFormat { found: u16, expected: u16 },

    /// Construction parameters rejected.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Reading or writing the snapshot file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for locusdb operations.
pub type Result<T> = std::result::Result<T, IndexError>;
