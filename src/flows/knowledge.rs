//! Knowledge-graph indexing: documents become summary nodes, entities, and
//! relationship edges in Neo4j.

use crate::config::IndexingConfig;
use crate::error::{DocError, MultidexError};
use crate::pipeline::extract::{DocumentSummary, Extractor, Relationship};
use crate::pipeline::source::{self, SourceDocument};
use crate::report::{DocOutcome, IndexingReport};
use crate::store::neo4j::GraphStore;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Run the knowledge-graph flow over `source_dir`.
///
/// Per document the export is: one `Document` node, one `RELATIONSHIP`
/// edge per extracted relationship, and a `MENTION` edge for each of its
/// subject and object entities.
pub async fn index_knowledge(
    source_dir: &Path,
    extractor: Arc<dyn Extractor>,
    graph: &GraphStore,
    config: &IndexingConfig,
) -> Result<IndexingReport, MultidexError> {
    let start = Instant::now();
    let documents = source::scan(source_dir, &config.included_patterns)?;

    let total = documents.len();
    info!("knowledge indexing: {total} documents in {}", source_dir.display());
    if let Some(p) = &config.progress {
        p.on_run_start(total);
    }

    let outcomes: Vec<DocOutcome> = stream::iter(documents.into_iter().map(|doc| {
        let extractor = Arc::clone(&extractor);
        process_document(doc, extractor, graph, config)
    }))
    .buffer_unordered(config.concurrency)
    .map(|outcome| {
        if let Some(p) = &config.progress {
            p.on_document_done(&outcome, total);
        }
        outcome
    })
    .collect()
    .await;

    let report = IndexingReport::from_outcomes(outcomes, start.elapsed().as_millis() as u64);
    if let Some(p) = &config.progress {
        p.on_run_complete(report.scanned, report.failed);
    }
    info!(
        "knowledge indexing complete: {}/{} documents, {} graph writes, {}ms",
        report.indexed, report.scanned, report.records, report.duration_ms
    );
    Ok(report)
}

async fn process_document(
    doc: SourceDocument,
    extractor: Arc<dyn Extractor>,
    graph: &GraphStore,
    config: &IndexingConfig,
) -> DocOutcome {
    let bytes = match tokio::fs::read(&doc.path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return DocOutcome::failed(DocError::ReadFailed {
                filename: doc.filename,
                detail: e.to_string(),
            })
        }
    };
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => {
            return DocOutcome::failed(DocError::NotText {
                filename: doc.filename,
            })
        }
    };
    if text.trim().is_empty() {
        return DocOutcome::skipped(doc.filename);
    }

    let summary = match extractor.summarize(&text).await {
        Ok(s) => s,
        Err(e) => {
            return DocOutcome::failed(DocError::ExtractFailed {
                filename: doc.filename,
                retries: config.max_retries,
                detail: e.to_string(),
            })
        }
    };
    let relationships = match extractor.relationships(&text).await {
        Ok(r) => r,
        Err(e) => {
            return DocOutcome::failed(DocError::ExtractFailed {
                filename: doc.filename,
                retries: config.max_retries,
                detail: e.to_string(),
            })
        }
    };

    let exported = export(graph, &doc.filename, &summary, &relationships).await;
    match exported {
        Ok(writes) => DocOutcome::indexed(doc.filename, writes),
        Err(e) => DocOutcome::failed(DocError::ExportFailed {
            filename: doc.filename,
            detail: e.to_string(),
        }),
    }
}

async fn export(
    graph: &GraphStore,
    filename: &str,
    summary: &DocumentSummary,
    relationships: &[Relationship],
) -> Result<usize, MultidexError> {
    graph.put_document(filename, summary).await?;
    let mut writes = 1usize;
    for rel in relationships {
        graph.put_relationship(rel).await?;
        graph.put_mention(filename, &rel.subject).await?;
        graph.put_mention(filename, &rel.object).await?;
        writes += 3;
    }
    Ok(writes)
}
