//! The index façade: graph store and payload table kept in lockstep.
//!
//! An [`Index`] assigns ids in insertion order, inserts the embedding into
//! the HNSW graph, then records the payload under the same id. Retrieval
//! searches the graph and joins ids back to payloads.
//!
//! All state sits behind one `RwLock`: inserts take it exclusively, while
//! retrievals and snapshot encoding share it. Cloning an `Index` produces a
//! new handle to the same shared data.

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::hnsw::graph::{HnswConfig, HnswIndex};
use crate::storage::codec;
use crate::storage::payload::PayloadTable;
use crate::storage::persistence;
use crate::vector::{Retrieved, Vector};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Internal data for an index, protected by a `RwLock`.
#[derive(Debug)]
pub struct IndexData<P> {
    pub config: IndexConfig,
    pub graph: HnswIndex,
    pub payloads: PayloadTable<P>,
}

impl<P: Serialize> IndexData<P> {
    fn encode(&self) -> Result<Vec<u8>> {
        codec::encode(&self.config, &self.graph, &self.payloads)
    }
}

/// A thread-safe HNSW vector index with attached payloads.
#[derive(Debug)]
pub struct Index<P = serde_json::Value> {
    data: Arc<RwLock<IndexData<P>>>,
    /// Serializes snapshot file writes.
    persist_lock: Arc<Mutex<()>>,
}

impl<P> Clone for Index<P> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            persist_lock: Arc::clone(&self.persist_lock),
        }
    }
}

impl<P> Index<P>
where
    P: Serialize + DeserializeOwned + Clone,
{
    /// Creates an empty index. `config.dim` must equal `dimensions`.
    pub fn new(dimensions: usize, config: IndexConfig) -> Result<Self> {
        if config.dim != dimensions {
            return Err(IndexError::InvalidConfig(format!(
                "config.dim {} != dimensions {}",
                config.dim, dimensions
            )));
        }
        config.validate()?;
        let graph = HnswIndex::new(dimensions, HnswConfig::from(&config));
        let payloads = PayloadTable::with_capacity(config.max_elements.min(1 << 16));
        Ok(Self::from_parts(config, graph, payloads))
    }

    fn from_parts(config: IndexConfig, graph: HnswIndex, payloads: PayloadTable<P>) -> Self {
        Self {
            data: Arc::new(RwLock::new(IndexData {
                config,
                graph,
                payloads,
            })),
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Inserts a vector and returns its id.
    ///
    /// The graph insert runs first; when it fails the payload table is left
    /// untouched. With `persist`, the resulting state is written to
    /// `storage_location`. A write failure is returned as `Io` and the
    /// insertion stays committed in memory.
    pub fn add_vector(&self, vector: Vector<P>, persist: bool) -> Result<u32> {
        let mut data = self.data.write();
        let id = Self::insert_locked(&mut data, vector)?;
        if persist {
            let data = RwLockWriteGuard::downgrade(data);
            let bytes = data.encode()?;
            let _file = self.persist_lock.lock();
            let path = data.config.storage_location.clone();
            drop(data);
            persistence::write_atomic(&path, &bytes)?;
        }
        Ok(id)
    }

    /// Inserts vectors in order under a single write lock.
    ///
    /// Stops at the first failure; vectors inserted before it stay committed
    /// and nothing is persisted. With `persist`, the state is written once
    /// after the last insert.
    pub fn add_vectors<I>(&self, vectors: I, persist: bool) -> Result<Vec<u32>>
    where
        I: IntoIterator<Item = Vector<P>>,
    {
        let mut data = self.data.write();
        let mut ids = Vec::new();
        for vector in vectors {
            ids.push(Self::insert_locked(&mut data, vector)?);
        }
        if persist {
            let data = RwLockWriteGuard::downgrade(data);
            let bytes = data.encode()?;
            let _file = self.persist_lock.lock();
            let path = data.config.storage_location.clone();
            drop(data);
            persistence::write_atomic(&path, &bytes)?;
        }
        Ok(ids)
    }

    fn insert_locked(data: &mut IndexData<P>, vector: Vector<P>) -> Result<u32> {
        let id = data.payloads.len() as u32;
        data.graph.insert(id, &vector.embedding)?;
        data.payloads.put(id, vector.payload);
        tracing::debug!(id, layer = data.graph.get_layer(id), "vector added");
        Ok(id)
    }

    /// Returns up to `number_of_results` payloads closest to `query`,
    /// ascending by distance.
    ///
    /// The search breadth is `max(ef_search, number_of_results)`.
    pub fn retrieve(&self, query: &[f32], number_of_results: usize) -> Result<Vec<Retrieved<P>>> {
        let ef = self.data.read().config.ef_search;
        self.retrieve_with_ef(query, number_of_results, ef)
    }

    /// Like [`Index::retrieve`] with an explicit search breadth. Values
    /// below `number_of_results` are raised to it.
    pub fn retrieve_with_ef(
        &self,
        query: &[f32],
        number_of_results: usize,
        ef_search: usize,
    ) -> Result<Vec<Retrieved<P>>> {
        let data = self.data.read();
        let hits = data
            .graph
            .search(query, number_of_results, ef_search.max(number_of_results))?;
        hits.into_iter()
            .map(|(id, distance)| -> Result<Retrieved<P>> {
                Ok(Retrieved {
                    payload: data.payloads.get(id)?.clone(),
                    distance,
                })
            })
            .collect()
    }

    /// Embedding and payload stored under `id`.
    pub fn get(&self, id: u32) -> Result<(Vec<f32>, P)> {
        let data = self.data.read();
        let embedding = data.graph.try_get_vector(id)?.to_vec();
        let payload = data.payloads.get(id)?.clone();
        Ok((embedding, payload))
    }

    /// Writes the full state to the configured `storage_location`.
    pub fn persist(&self) -> Result<()> {
        let path = self.data.read().config.storage_location.clone();
        self.persist_to(path)
    }

    /// Writes the full state to `path`, replacing any existing file
    /// atomically. The parent directory must exist.
    pub fn persist_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = self.data.read();
        let bytes = data.encode()?;
        let _file = self.persist_lock.lock();
        drop(data);
        persistence::write_atomic(path.as_ref(), &bytes)?;
        Ok(())
    }

    /// Loads an index written by [`Index::persist_to`]. Dimension, metric
    /// and every other parameter come from the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = persistence::read_snapshot(path)?;
        let decoded = codec::decode::<P>(&raw).inspect_err(|e| {
            tracing::warn!("Rejected snapshot {:?}: {}", path, e);
        })?;
        tracing::info!(
            "Loaded index {:?} ({} vectors, dim {}, space {})",
            path,
            decoded.payloads.len(),
            decoded.config.dim,
            decoded.config.space
        );
        Ok(Self::from_parts(
            decoded.config,
            decoded.graph,
            decoded.payloads,
        ))
    }

    /// Number of inserted vectors.
    pub fn count(&self) -> usize {
        self.data.read().payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn dimension(&self) -> usize {
        self.data.read().config.dim
    }

    /// Copy of the construction parameters.
    pub fn config(&self) -> IndexConfig {
        self.data.read().config.clone()
    }
}
