//! Qdrant export target for page embeddings.
//!
//! The collection stores one multi-vector per point (MaxSim comparator,
//! cosine distance) with `filename` and optional `page` in the payload —
//! everything the search loop needs to present a hit.

use crate::error::MultidexError;
use crate::store::{PageHit, PageRecord};
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, MultiVectorComparator, MultiVectorConfigBuilder,
    PointStruct, Query, QueryPointsBuilder, ScoredPoint, UpsertPointsBuilder, Vector,
    VectorInput, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, info};

fn export_err(e: impl std::fmt::Display) -> MultidexError {
    MultidexError::ExportFailed {
        target: "qdrant".into(),
        detail: e.to_string(),
    }
}

fn query_err(e: impl std::fmt::Display) -> MultidexError {
    MultidexError::QueryFailed {
        target: "qdrant".into(),
        detail: e.to_string(),
    }
}

/// Client for one page-embedding collection.
pub struct PageIndex {
    client: Qdrant,
    collection: String,
}

impl PageIndex {
    /// Connect to Qdrant's gRPC endpoint.
    pub fn connect(url: &str, collection: &str) -> Result<Self, MultidexError> {
        let client = Qdrant::from_url(url).build().map_err(export_err)?;
        Ok(Self {
            client,
            collection: collection.to_string(),
        })
    }

    /// Create the collection if it does not exist yet.
    ///
    /// `dim` is the length of each individual vector in a page's
    /// multi-vector embedding.
    pub async fn ensure_collection(&self, dim: usize) -> Result<(), MultidexError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(export_err)?;
        if exists {
            return Ok(());
        }
        info!("creating qdrant collection '{}' (dim {dim})", self.collection);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(dim as u64, Distance::Cosine).multivector_config(
                        MultiVectorConfigBuilder::new(MultiVectorComparator::MaxSim),
                    ),
                ),
            )
            .await
            .map_err(export_err)?;
        Ok(())
    }

    /// Upsert one document's page records. Point ids are the generated
    /// record UUIDs, so repeated runs add rather than clobber; callers that
    /// want replace semantics should reuse ids.
    pub async fn upsert(&self, records: Vec<PageRecord>) -> Result<(), MultidexError> {
        if records.is_empty() {
            return Ok(());
        }
        let count = records.len();
        let points: Vec<PointStruct> = records.into_iter().map(to_point).collect();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(export_err)?;
        debug!("upserted {count} points into '{}'", self.collection);
        Ok(())
    }

    /// Nearest-neighbour query with a multi-vector query embedding.
    pub async fn query(
        &self,
        embedding: Vec<Vec<f32>>,
        limit: usize,
    ) -> Result<Vec<PageHit>, MultidexError> {
        let response = self
            .client
            .query(
                QueryPointsBuilder::new(&self.collection)
                    .query(Query::new_nearest(VectorInput::new_multi(embedding)))
                    .limit(limit as u64)
                    .with_payload(true),
            )
            .await
            .map_err(query_err)?;
        Ok(response.result.into_iter().map(hit_from).collect())
    }
}

fn to_point(record: PageRecord) -> PointStruct {
    let mut payload = Payload::new();
    payload.insert("filename", record.filename);
    if let Some(page) = record.page {
        payload.insert("page", page as i64);
    }
    PointStruct::new(
        record.id.to_string(),
        Vector::new_multi(record.embedding),
        payload,
    )
}

fn hit_from(point: ScoredPoint) -> PageHit {
    let filename = point
        .payload
        .get("filename")
        .and_then(|v| match &v.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default();
    let page = point.payload.get("page").and_then(|v| match &v.kind {
        Some(Kind::IntegerValue(i)) => u32::try_from(*i).ok(),
        _ => None,
    });
    PageHit {
        score: point.score,
        filename,
        page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::Value;
    use std::collections::HashMap;

    #[test]
    fn hit_from_reads_payload() {
        let mut payload = HashMap::new();
        payload.insert(
            "filename".to_string(),
            Value {
                kind: Some(Kind::StringValue("report.pdf".into())),
            },
        );
        payload.insert(
            "page".to_string(),
            Value {
                kind: Some(Kind::IntegerValue(2)),
            },
        );
        let hit = hit_from(ScoredPoint {
            score: 0.87,
            payload,
            ..Default::default()
        });
        assert_eq!(hit.filename, "report.pdf");
        assert_eq!(hit.page, Some(2));
        assert!((hit.score - 0.87).abs() < f32::EPSILON);
    }

    #[test]
    fn hit_without_page_payload() {
        let mut payload = HashMap::new();
        payload.insert(
            "filename".to_string(),
            Value {
                kind: Some(Kind::StringValue("photo.jpg".into())),
            },
        );
        let hit = hit_from(ScoredPoint {
            score: 0.5,
            payload,
            ..Default::default()
        });
        assert_eq!(hit.page, None);
    }
}
