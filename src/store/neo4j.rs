//! Neo4j export target for the knowledge-graph pipeline.
//!
//! Graph shape:
//!
//! * `(:Document {filename, title, summary})` — one node per source file
//! * `(:Entity {value})` — one node per distinct concept
//! * `(:Entity)-[:RELATIONSHIP {predicate}]->(:Entity)`
//! * `(:Document)-[:MENTION]->(:Entity)` — the document mentions the concept
//!
//! Every write is a `MERGE`, so re-running the pipeline over the same
//! documents converges instead of duplicating nodes.

use crate::error::MultidexError;
use crate::pipeline::extract::{DocumentSummary, Relationship};
use neo4rs::{query, Graph};
use tracing::debug;

fn export_err(e: impl std::fmt::Display) -> MultidexError {
    MultidexError::ExportFailed {
        target: "neo4j".into(),
        detail: e.to_string(),
    }
}

/// Bolt client wrapper for the knowledge graph.
pub struct GraphStore {
    graph: Graph,
}

impl GraphStore {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, MultidexError> {
        let graph = Graph::new(uri, user, password).await.map_err(export_err)?;
        Ok(Self { graph })
    }

    /// Upsert the document node with its extracted summary.
    pub async fn put_document(
        &self,
        filename: &str,
        summary: &DocumentSummary,
    ) -> Result<(), MultidexError> {
        self.graph
            .run(
                query(
                    "MERGE (d:Document {filename: $filename}) \
                     SET d.title = $title, d.summary = $summary",
                )
                .param("filename", filename)
                .param("title", summary.title.as_str())
                .param("summary", summary.summary.as_str()),
            )
            .await
            .map_err(export_err)?;
        debug!("merged Document node for '{filename}'");
        Ok(())
    }

    /// Upsert both entity nodes and the relationship edge between them.
    pub async fn put_relationship(&self, rel: &Relationship) -> Result<(), MultidexError> {
        self.graph
            .run(
                query(
                    "MERGE (s:Entity {value: $subject}) \
                     MERGE (o:Entity {value: $object}) \
                     MERGE (s)-[:RELATIONSHIP {predicate: $predicate}]->(o)",
                )
                .param("subject", rel.subject.as_str())
                .param("object", rel.object.as_str())
                .param("predicate", rel.predicate.as_str()),
            )
            .await
            .map_err(export_err)
    }

    /// Record that `filename` mentions `entity`. The document node must
    /// already exist (see [`GraphStore::put_document`]).
    pub async fn put_mention(&self, filename: &str, entity: &str) -> Result<(), MultidexError> {
        self.graph
            .run(
                query(
                    "MATCH (d:Document {filename: $filename}) \
                     MERGE (e:Entity {value: $entity}) \
                     MERGE (d)-[:MENTION]->(e)",
                )
                .param("filename", filename)
                .param("entity", entity),
            )
            .await
            .map_err(export_err)
    }
}
