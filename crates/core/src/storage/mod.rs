//! Storage layer: payload table, snapshot codec, and disk persistence.
//!
//! Index state lives in memory. Durability comes from whole-index snapshots
//! (versioned bincode body + CRC32 footer) written with temp-file + rename.

/// Versioned snapshot byte format.
pub mod codec;
/// Payload side table keyed by node id.
pub mod payload;
/// Atomic snapshot file writes and reads.
pub mod persistence;

pub use codec::{decode, encode, DecodedIndex, FORMAT_VERSION};
pub use payload::PayloadTable;
pub use persistence::{read_snapshot, write_atomic};
