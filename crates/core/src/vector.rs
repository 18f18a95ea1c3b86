//! Input and output records of the index.
//!
//! A [`Vector`] pairs an embedding with caller-owned payload data and is
//! consumed by insertion. A [`Retrieved`] is one row of a retrieval result.

use serde::{Deserialize, Serialize};

/// An embedding paired with arbitrary payload data.
///
/// The payload type defaults to `serde_json::Value`, which accepts
/// dictionary-shaped data such as `{"id": 7, "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector<P = serde_json::Value> {
    /// Fixed-length embedding. Its length must equal the index dimension.
    pub embedding: Vec<f32>,
    /// Data returned alongside the embedding on retrieval.
    pub payload: P,
}

impl<P> Vector<P> {
    pub fn new(embedding: Vec<f32>, payload: P) -> Self {
        Self { embedding, payload }
    }
}

/// One retrieval result: the stored payload and its distance to the query.
///
/// Lower distance means more similar under every metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retrieved<P = serde_json::Value> {
    pub payload: P,
    pub distance: f32,
}
