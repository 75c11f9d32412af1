//! Text indexing: text files become overlapping chunk embeddings in a
//! Postgres/pgvector table, ready for the REST search surface.

use crate::config::IndexingConfig;
use crate::error::{DocError, MultidexError};
use crate::pipeline::chunk;
use crate::pipeline::embed::TextEmbedder;
use crate::pipeline::source::{self, SourceDocument};
use crate::report::{DocOutcome, IndexingReport};
use crate::store::postgres::ChunkStore;
use crate::store::ChunkRecord;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Run the text-indexing flow over `source_dir`.
pub async fn index_text(
    source_dir: &Path,
    embedder: Arc<dyn TextEmbedder>,
    store: &ChunkStore,
    dim: usize,
    config: &IndexingConfig,
) -> Result<IndexingReport, MultidexError> {
    let start = Instant::now();
    let documents = source::scan(source_dir, &config.included_patterns)?;
    store.ensure_schema(dim).await?;

    let total = documents.len();
    info!("text indexing: {total} documents in {}", source_dir.display());
    if let Some(p) = &config.progress {
        p.on_run_start(total);
    }

    let outcomes: Vec<DocOutcome> = stream::iter(documents.into_iter().map(|doc| {
        let embedder = Arc::clone(&embedder);
        process_document(doc, embedder, store, config)
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
        "text indexing complete: {}/{} documents, {} chunks, {}ms",
        report.indexed, report.scanned, report.records, report.duration_ms
    );
    Ok(report)
}

async fn process_document(
    doc: SourceDocument,
    embedder: Arc<dyn TextEmbedder>,
    store: &ChunkStore,
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

    let chunks = chunk::split_text(&text, config.chunk_size, config.chunk_overlap);
    if chunks.is_empty() {
        return DocOutcome::skipped(doc.filename);
    }

    let mut records = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        match embedder.embed_text(&chunk.text).await {
            Ok(embedding) => records.push(ChunkRecord {
                filename: doc.filename.clone(),
                location: chunk.location,
                text: chunk.text.clone(),
                embedding,
            }),
            Err(e) => {
                return DocOutcome::failed(DocError::EmbedFailed {
                    filename: doc.filename,
                    retries: config.max_retries,
                    detail: e.to_string(),
                })
            }
        }
    }

    let count = records.len();
    if let Err(e) = store.replace_document(&doc.filename, &records).await {
        return DocOutcome::failed(DocError::ExportFailed {
            filename: doc.filename,
            detail: e.to_string(),
        });
    }
    DocOutcome::indexed(doc.filename, count)
}
