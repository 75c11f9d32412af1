//! Export targets: the records the pipelines collect and the store clients
//! that persist them.
//!
//! Each backend lives in its own module ([`qdrant`] for page embeddings,
//! [`postgres`] for text chunks, [`neo4j`] for the knowledge graph). Record
//! types are backend-agnostic; the store modules own the mapping to their
//! wire formats.

pub mod neo4j;
pub mod postgres;
pub mod qdrant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A page embedding ready for the vector index.
///
/// `embedding` is multi-vector: one vector per image patch, compared with
/// MaxSim at query time.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: Uuid,
    /// Source filename (relative to the indexed directory).
    pub filename: String,
    /// 1-based page ordinal; `None` for single-image sources.
    pub page: Option<u32>,
    pub embedding: Vec<Vec<f32>>,
}

impl PageRecord {
    /// Build a record with a freshly generated id.
    pub fn new(filename: impl Into<String>, page: Option<u32>, embedding: Vec<Vec<f32>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            page,
            embedding,
        }
    }
}

/// A text-chunk embedding ready for the relational store.
///
/// `(filename, location)` is the primary key; re-indexing a file replaces
/// all of its rows.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub filename: String,
    /// Byte offset of the chunk start in the source document.
    pub location: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A ranked page match from the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageHit {
    pub score: f32,
    pub filename: String,
    pub page: Option<u32>,
}

/// A ranked chunk match from the relational store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkHit {
    pub filename: String,
    pub text: String,
    /// Cosine similarity expressed as `1 - distance`.
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_record_ids_are_unique() {
        let a = PageRecord::new("x.pdf", Some(1), vec![vec![0.0]]);
        let b = PageRecord::new("x.pdf", Some(1), vec![vec![0.0]]);
        assert_ne!(a.id, b.id);
    }
}
