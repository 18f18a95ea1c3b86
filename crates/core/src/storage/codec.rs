//! Snapshot codec: the versioned byte format of a whole index.
//!
//! Layout:
//!
//! ```text
//! [magic "LOCUSIDX" 8B][format version u16 LE][bincode body][footer "LCR1" 4B][CRC32 u32 BE]
//! ```
//!
//! The body holds the [`IndexConfig`], the full [`HnswIndex`] (embeddings,
//! per-node layers, neighbour lists, entry point) and the payload table.
//! Payloads are stored as JSON strings inside the bincode body, so
//! self-describing payload types such as `serde_json::Value` survive the
//! round trip. The CRC covers everything before the footer.

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::hnsw::graph::{HnswConfig, HnswIndex};
use crate::storage::payload::PayloadTable;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Leading magic bytes of every snapshot.
pub const SNAPSHOT_MAGIC: &[u8; 8] = b"LOCUSIDX";

/// Magic bytes placed before the CRC32 footer.
pub const SNAPSHOT_CRC_MAGIC: &[u8; 4] = b"LCR1";

/// Current format version. Snapshots with any other version are rejected.
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = SNAPSHOT_MAGIC.len() + 2;
const FOOTER_LEN: usize = SNAPSHOT_CRC_MAGIC.len() + 4;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    config: &'a IndexConfig,
    graph: &'a HnswIndex,
    payloads: Vec<(u32, String)>,
}

#[derive(Deserialize)]
struct SnapshotOwned {
    config: IndexConfig,
    graph: HnswIndex,
    payloads: Vec<(u32, String)>,
}

/// Index state recovered from a snapshot.
#[derive(Debug)]
pub struct DecodedIndex<P> {
    pub config: IndexConfig,
    pub graph: HnswIndex,
    pub payloads: PayloadTable<P>,
}

/// Encodes the full index state into snapshot bytes.
pub fn encode<P: Serialize>(
    config: &IndexConfig,
    graph: &HnswIndex,
    payloads: &PayloadTable<P>,
) -> Result<Vec<u8>> {
    let payloads = payloads
        .iter_sorted()
        .into_iter()
        .map(|(id, p)| {
            serde_json::to_string(p)
                .map(|json| (id, json))
                .map_err(|e| IndexError::CorruptData(format!("payload {id} not serializable: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let snapshot = SnapshotRef {
        config,
        graph,
        payloads,
    };
    let body = bincode::serialize(&snapshot)
        .map_err(|e| IndexError::CorruptData(format!("snapshot encoding failed: {e}")))?;

    let mut output = Vec::with_capacity(HEADER_LEN + body.len() + FOOTER_LEN);
    output.extend_from_slice(SNAPSHOT_MAGIC);
    output.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    output.extend_from_slice(&body);
    let crc = crc32fast::hash(&output);
    output.extend_from_slice(SNAPSHOT_CRC_MAGIC);
    output.extend_from_slice(&crc.to_be_bytes());
    Ok(output)
}

/// Decodes and validates snapshot bytes.
///
/// Returns `CorruptData` for anything that is not a well-formed snapshot and
/// `IncompatibleFormat` for a snapshot of another format version.
pub fn decode<P: DeserializeOwned>(raw: &[u8]) -> Result<DecodedIndex<P>> {
    if raw.len() < HEADER_LEN + FOOTER_LEN {
        return Err(IndexError::CorruptData(format!(
            "snapshot too short ({} bytes)",
            raw.len()
        )));
    }
    if &raw[..SNAPSHOT_MAGIC.len()] != SNAPSHOT_MAGIC {
        return Err(IndexError::CorruptData("bad snapshot magic".to_string()));
    }
    let version = u16::from_le_bytes([raw[8], raw[9]]);
    if version != FORMAT_VERSION {
        return Err(IndexError::IncompatibleFormat {
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let footer_start = raw.len() - FOOTER_LEN;
    if &raw[footer_start..footer_start + 4] != SNAPSHOT_CRC_MAGIC {
        return Err(IndexError::CorruptData("missing CRC32 footer".to_string()));
    }
    let stored_crc = u32::from_be_bytes([
        raw[raw.len() - 4],
        raw[raw.len() - 3],
        raw[raw.len() - 2],
        raw[raw.len() - 1],
    ]);
    let computed_crc = crc32fast::hash(&raw[..footer_start]);
    if computed_crc != stored_crc {
        return Err(IndexError::CorruptData(format!(
            "CRC32 mismatch: expected {:#010x}, got {:#010x}",
            stored_crc, computed_crc
        )));
    }
    tracing::debug!("snapshot CRC32 verified: {:#010x}", stored_crc);

    let snapshot: SnapshotOwned = bincode::deserialize(&raw[HEADER_LEN..footer_start])
        .map_err(|e| IndexError::CorruptData(format!("snapshot body: {e}")))?;

    check_consistency(&snapshot)?;

    let payloads = snapshot
        .payloads
        .into_iter()
        .map(|(id, json)| {
            serde_json::from_str::<P>(&json)
                .map(|p| (id, p))
                .map_err(|e| IndexError::CorruptData(format!("payload {id}: {e}")))
        })
        .collect::<Result<PayloadTable<P>>>()?;

    Ok(DecodedIndex {
        config: snapshot.config,
        graph: snapshot.graph,
        payloads,
    })
}

fn check_consistency(snapshot: &SnapshotOwned) -> Result<()> {
    let corrupt = |msg: String| Err(IndexError::CorruptData(msg));

    if let Err(e) = snapshot.config.validate() {
        return corrupt(format!("stored config rejected: {e}"));
    }
    if let Err(e) = snapshot.graph.validate() {
        return corrupt(format!("graph validation failed: {e}"));
    }
    if snapshot.graph.dimension != snapshot.config.dim {
        return corrupt(format!(
            "graph dimension {} != config dimension {}",
            snapshot.graph.dimension, snapshot.config.dim
        ));
    }
    if snapshot.graph.config != HnswConfig::from(&snapshot.config) {
        return corrupt("graph parameters disagree with stored config".to_string());
    }
    if snapshot.payloads.len() != snapshot.graph.len() {
        return corrupt(format!(
            "payloads({}) != node_count({})",
            snapshot.payloads.len(),
            snapshot.graph.len()
        ));
    }
    for (expected, &(id, _)) in snapshot.payloads.iter().enumerate() {
        if id as usize != expected {
            return corrupt(format!("payload id {} out of sequence at {}", id, expected));
        }
    }
    Ok(())
}
